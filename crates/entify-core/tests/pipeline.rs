//! End-to-end runs of the default handler chain.

use std::fs;

use entify_core::{
    EntityMain, HandlerFactory, JsonRulesLoader, ModelRegistry, RulesLoader, StaticModel,
};
use entify_model::{
    Directive, EntifyError, EntityOptions, FieldRules, Record, Rules, Value, record_of,
};
use indexmap::IndexMap;
use tempfile::TempDir;

fn directives(pairs: Vec<(&str, Value)>) -> Value {
    Value::Map(record_of(pairs))
}

fn contacts_model() -> StaticModel {
    let skills_check = Value::callable(|value| match value.as_i64() {
        Some(skills) if skills > 5 => Value::Bool(true),
        _ => Value::from("Skills must be greater than 5"),
    });
    let halve = Value::callable(|value| Value::Float(value.as_f64().unwrap_or_default() * 0.5));

    StaticModel(Value::Map(record_of([
        (
            "name",
            directives(vec![
                ("validate", Value::from("minlength:1|maxlength:20")),
                ("label", Value::from("User name")),
            ]),
        ),
        (
            "lastname",
            directives(vec![
                ("validate", Value::from("")),
                ("label", Value::from("User lastname")),
            ]),
        ),
        (
            "age",
            directives(vec![
                ("validate", Value::from("min:18|max:90")),
                ("label", Value::from("User age")),
                ("convert", Value::from("int")),
            ]),
        ),
        (
            "description",
            directives(vec![
                ("validate", Value::from("required")),
                ("label", Value::from("User description")),
                (
                    "default",
                    Value::from("<script>alert()</script>Lorem ipsum dolor sit amet"),
                ),
                ("escape", Value::Bool(true)),
            ]),
        ),
        (
            "email",
            directives(vec![
                ("validate", Value::from("email|required")),
                ("label", Value::from("User email")),
            ]),
        ),
        (
            "password",
            directives(vec![
                ("validate", Value::from("")),
                ("label", Value::from("User password")),
                ("hide", Value::Bool(true)),
            ]),
        ),
        (
            "skills",
            directives(vec![
                ("validate", Value::from("")),
                ("label", Value::from("User skills")),
                ("convert", Value::from("int")),
                ("check", skills_check),
                ("filter", halve),
            ]),
        ),
    ])))
}

fn contacts_input() -> Value {
    Value::Map(record_of([
        ("name", Value::from("Joe")),
        ("lastname", Value::from("Doe")),
        ("age", Value::from("30")),
        ("email", Value::from("admin@example")),
        ("password", Value::from("")),
        ("skills", Value::Int(6)),
    ]))
}

fn first_record(entity: &EntityMain) -> &Record {
    entity
        .export_one(0)
        .and_then(Value::as_map)
        .expect("first exported record")
}

#[test]
fn contacts_record_is_converted_escaped_and_hidden() {
    let mut registry = ModelRegistry::new();
    registry.register("Contacts", contacts_model());
    let rules = registry.load("contacts", None).unwrap();

    let handlers = HandlerFactory::new(rules).handlers();
    let entity = EntityMain::new(handlers, contacts_input(), None, None).unwrap();

    let record = first_record(&entity);
    assert_eq!(record["age"], Value::Int(30));
    assert_eq!(record["skills"], Value::Float(3.0));
    assert_eq!(
        record["description"],
        Value::from("&lt;script&gt;alert()&lt;/script&gt;Lorem ipsum dolor sit amet")
    );
    assert!(!record.contains_key("password"));

    let errors = entity.errors().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0], "User email must be a valid email address");

    let info = entity.info().unwrap();
    assert!(info["rules"].as_map().unwrap().contains_key("skills"));
}

#[test]
fn check_failures_are_recorded_not_raised() {
    let mut registry = ModelRegistry::new();
    registry.register("contacts", contacts_model());
    let rules = registry.load("contacts", None).unwrap();

    let mut input = contacts_input();
    if let Some(record) = input.as_map_mut() {
        record.insert("skills".to_string(), Value::from("2"));
        record.insert("email".to_string(), Value::from("joe@example.com"));
    }
    let entity = EntityMain::new(HandlerFactory::new(rules).handlers(), input, None, None).unwrap();

    assert_eq!(
        entity.errors(),
        Some(&["Skills must be greater than 5".to_string()][..])
    );
    assert_eq!(first_record(&entity)["skills"], Value::Float(1.0));
}

#[test]
fn numeric_string_is_converted_after_validation() {
    let mut fields = IndexMap::new();
    fields.insert(
        "age".to_string(),
        FieldRules::new()
            .with(Directive::Convert, "int")
            .with(Directive::Validate, "min:18"),
    );
    let handlers = HandlerFactory::new(Rules::new("people", fields)).handlers();
    let entity = EntityMain::new(
        handlers,
        Value::Map(record_of([("age", "30")])),
        None,
        None,
    )
    .unwrap();

    assert_eq!(
        entity.export(),
        Some(&Value::List(vec![Value::Map(record_of([("age", 30)]))]))
    );
    assert!(entity.errors().is_none());
}

#[test]
fn missing_field_short_circuits_with_one_error() {
    let mut fields = IndexMap::new();
    fields.insert(
        "name".to_string(),
        FieldRules::new()
            .with(Directive::Label, "Name")
            .with(Directive::Validate, "required"),
    );
    let handlers = HandlerFactory::new(Rules::new("people", fields)).handlers();
    let data = Value::List(vec![Value::Map(Record::new())]);
    let entity = EntityMain::new(handlers, data, None, None).unwrap();

    assert_eq!(
        entity.errors(),
        Some(&["Key name not found in people".to_string()][..])
    );
    assert_eq!(
        entity.export(),
        Some(&Value::List(vec![Value::Map(Record::new())]))
    );
}

#[test]
fn options_change_default_handler_behavior() {
    let mut registry = ModelRegistry::new();
    registry.register("contacts", contacts_model());
    let rules = registry.load("contacts", None).unwrap();

    let mut options = EntityOptions::default();
    options.set_skip_filters(true).set_skip_validation(true);
    let entity = EntityMain::new(
        HandlerFactory::new(rules).with_options(options).handlers(),
        contacts_input(),
        None,
        None,
    )
    .unwrap();

    let record = first_record(&entity);
    assert_eq!(record["age"], Value::from("30"));
    assert!(!record.contains_key("password"));
    assert!(entity.errors().is_none());
    assert!(entity.options().snapshot().skip_filters);
}

#[test]
fn json_loader_reads_model_files() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("people.json"),
        r#"{
            "name": {"validate": "required", "label": "Name"},
            "age": {"validate": "min:18", "label": "Age", "convert": "int", "default": 18}
        }"#,
    )
    .unwrap();
    fs::write(dir.path().join("broken.json"), r#"{"name": {"label": "Name"}}"#).unwrap();

    let loader = JsonRulesLoader::new(dir.path());
    assert_eq!(loader.available_models().unwrap(), vec!["broken", "people"]);

    let rules = loader.load("people", None).unwrap();
    let entity = EntityMain::new(
        HandlerFactory::new(rules).handlers(),
        Value::Map(record_of([("name", "Ann")])),
        None,
        None,
    )
    .unwrap();
    assert_eq!(first_record(&entity)["age"], Value::Int(18));

    assert!(matches!(
        loader.load("broken", None),
        Err(EntifyError::MissingDirective { directive: "validate", .. })
    ));
    assert!(matches!(
        loader.load("orders", None),
        Err(EntifyError::ModelNotFound { .. })
    ));
}
