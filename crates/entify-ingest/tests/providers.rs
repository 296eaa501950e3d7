//! Providers built through `Entification`.

use std::fs;

use entify_core::{HandlerFactory, ModelRegistry, StaticModel};
use entify_ingest::{
    Entification, FILES_KEY, FormProvider, FormRequest, INLINE_RULES_NAME, IngestError,
    PAGINATION_KEY, UploadedFile,
};
use entify_model::{EntifyError, Value, record_of};
use tempfile::TempDir;

const PNG: [u8; 12] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

fn field(validate: &str, label: &str) -> Value {
    Value::Map(record_of([("validate", validate), ("label", label)]))
}

fn profile_rules() -> Value {
    Value::Map(record_of([
        ("name", field("required", "Name")),
        ("avatar", field("", "Avatar")),
    ]))
}

fn entification() -> Entification<ModelRegistry> {
    let mut registry = ModelRegistry::new();
    registry.register("user_profile", StaticModel(profile_rules()));
    Entification::new(registry)
}

fn form(name: &str) -> FormRequest {
    FormRequest::new(record_of([("name", name), ("avatar", "")]))
}

#[test]
fn array_provider_resolves_models_by_name() {
    let data = Value::List(
        (0..7)
            .map(|n| Value::Map(record_of([("name", format!("user {n}")), ("avatar", String::new())])))
            .collect(),
    );
    let mut provider = entification().array_provider(data, "UserProfile").unwrap();
    provider.paginate(3, 2).unwrap();
    let entity = provider.entity().unwrap();

    let page = entity.export().and_then(Value::as_list).unwrap();
    assert_eq!(page.len(), 3);
    assert_eq!(page[0].as_map().unwrap()["name"], Value::from("user 3"));

    let info = entity.info().unwrap();
    let pagination = info[PAGINATION_KEY].as_map().unwrap();
    assert_eq!(pagination["previousPages"], Value::List(vec![Value::Int(1)]));
    assert_eq!(pagination["nextPages"], Value::List(vec![Value::Int(3)]));
    assert!(info.contains_key("rules"));
}

#[test]
fn inline_rules_are_checked_and_named_default() {
    let entification = entification();
    let rules = entification.rules(profile_rules().into()).unwrap();
    assert_eq!(rules.name(), INLINE_RULES_NAME);

    let broken = Value::Map(record_of([("name", Value::Map(record_of([("label", "Name")])))]));
    let err = entification.array_provider(Value::Null, broken).err().unwrap();
    assert!(matches!(
        err,
        IngestError::Pipeline(EntifyError::MissingDirective { .. })
    ));
}

#[test]
fn missing_model_is_fatal() {
    let err = entification()
        .array_provider(Value::Null, "orders")
        .err()
        .unwrap();
    assert!(matches!(err, IngestError::Pipeline(EntifyError::ModelNotFound { .. })));
}

#[test]
fn form_without_body_is_rejected() {
    let provider = entification()
        .form_provider(FormRequest::default(), "user_profile", None, vec![], "2M")
        .unwrap();
    assert!(matches!(provider.entity(), Err(IngestError::NoData)));
}

#[test]
fn form_uploads_are_stored_under_base_name() {
    let dir = TempDir::new().unwrap();
    let request = form("Ann").with_file("avatar", UploadedFile::new("../../me.png", PNG.to_vec()));
    let provider = entification()
        .form_provider(
            request,
            "user_profile",
            Some(dir.path().to_path_buf()),
            vec!["image/png".to_string()],
            "1k",
        )
        .unwrap();
    let entity = provider.entity().unwrap();

    let stored = dir.path().join("me.png");
    assert_eq!(fs::read(&stored).unwrap(), PNG.to_vec());
    let files = entity.info().unwrap()[FILES_KEY].as_map().unwrap();
    assert_eq!(files["avatar"], Value::from(stored.display().to_string()));
    assert!(entity.errors().is_none());
}

#[test]
fn rejected_uploads_leave_no_files_behind() {
    let dir = TempDir::new().unwrap();
    let request = form("Ann")
        .with_file("avatar", UploadedFile::new("me.png", PNG.to_vec()))
        .with_file("resume", UploadedFile::new("cv.txt", b"plain text".to_vec()));
    let provider = entification()
        .form_provider(
            request,
            "user_profile",
            Some(dir.path().to_path_buf()),
            vec!["image/png".to_string()],
            "1k",
        )
        .unwrap();

    let err = provider.entity().err().unwrap();
    assert!(matches!(err, IngestError::FileTypeNotAllowed { ref field, .. } if field == "resume"));
    assert!(!dir.path().join("me.png").exists());
    assert!(!dir.path().join("cv.txt").exists());
}

#[test]
fn oversized_and_duplicate_uploads_are_rejected() {
    let dir = TempDir::new().unwrap();
    let large = form("Ann").with_file("avatar", UploadedFile::new("big.png", vec![0x89; 2048]));
    let provider = entification()
        .form_provider(large, "user_profile", Some(dir.path().to_path_buf()), vec![], "1k")
        .unwrap();
    assert!(matches!(provider.entity(), Err(IngestError::FileTooLarge { size: 2048, .. })));

    fs::write(dir.path().join("taken.png"), b"x").unwrap();
    let duplicate = form("Ann").with_file("avatar", UploadedFile::new("taken.png", PNG.to_vec()));
    let provider = entification()
        .form_provider(
            duplicate,
            "user_profile",
            Some(dir.path().to_path_buf()),
            vec!["image/png".to_string()],
            "1k",
        )
        .unwrap();
    assert!(matches!(provider.entity(), Err(IngestError::FileExists { .. })));
}

#[test]
fn missing_upload_directory_is_fatal() {
    let dir = TempDir::new().unwrap();
    let request = form("Ann").with_file("avatar", UploadedFile::new("me.png", PNG.to_vec()));
    let provider = entification()
        .form_provider(
            request,
            "user_profile",
            Some(dir.path().join("missing")),
            vec!["image/png".to_string()],
            "1k",
        )
        .unwrap();
    assert!(matches!(provider.entity(), Err(IngestError::UploadDirMissing { .. })));
}

#[test]
fn failed_transfers_are_skipped() {
    let dir = TempDir::new().unwrap();
    let request = form("Ann").with_file("avatar", UploadedFile::failed("me.png", "partial upload"));
    let rules = entification().rules("user_profile".into()).unwrap();
    let provider = FormProvider::with_defaults(
        HandlerFactory::new(rules).handlers(),
        request,
        Some(dir.path().to_path_buf()),
    )
    .unwrap();
    let entity = provider.entity().unwrap();
    let files = entity.info().unwrap()[FILES_KEY].as_map().unwrap();
    assert!(files.is_empty());
}
