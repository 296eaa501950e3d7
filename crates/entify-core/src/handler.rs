//! Pipeline stages.
//!
//! A stage receives the running value and the current metadata and returns
//! the value for the next stage, or `None` to stop the chain. Recoverable
//! problems are collected as messages and drained by [`crate::EntityMain`]
//! after each stage.

use entify_model::{
    Directive, EntifyError, FieldRules, Info, OptionName, Record, Result, Rules, SharedOptions,
    SharedTranslator, Value,
};
use entify_validate::Validator;
use tracing::{debug, trace};

use crate::filters::{FilterLibrary, FilterOp};

/// A stage in the handler chain.
pub trait EntityHandler {
    fn handle(&mut self, data: Value, info: Option<&Info>) -> Result<Option<Value>>;

    /// Messages collected since the last [`EntityHandler::clear_errors`], or
    /// `None` when there are none.
    fn errors(&self) -> Option<&[String]>;

    fn clear_errors(&mut self);

    /// Metadata produced by the last run.
    fn info(&self) -> Option<&Info> {
        None
    }

    /// Whether [`EntityHandler::info`] replaces the metadata passed along the chain.
    fn needs_refresh_info(&self) -> bool {
        false
    }
}

type StageFn = dyn FnMut(Value, Option<&Info>) -> Result<Option<Value>>;

/// Stage backed by a closure. Closure stages never record messages.
pub struct FnHandler {
    run: Box<StageFn>,
}

impl FnHandler {
    pub fn new<F>(run: F) -> Self
    where
        F: FnMut(Value, Option<&Info>) -> Result<Option<Value>> + 'static,
    {
        Self { run: Box::new(run) }
    }
}

impl EntityHandler for FnHandler {
    fn handle(&mut self, data: Value, info: Option<&Info>) -> Result<Option<Value>> {
        (self.run)(data, info)
    }

    fn errors(&self) -> Option<&[String]> {
        None
    }

    fn clear_errors(&mut self) {}
}

/// The rules-driven stage every chain starts with.
///
/// Runs normalize, default-fill and prune, validation, filters and hiding,
/// in that order. The output is always a list of maps.
pub struct DefaultHandler {
    rules: Rules,
    options: SharedOptions,
    filters: Box<dyn FilterLibrary>,
    validator: Box<dyn Validator>,
    translator: SharedTranslator,
    errors: Vec<String>,
    info: Option<Info>,
    needs_refresh_info: bool,
}

impl DefaultHandler {
    pub const KEY: &'static str = "DefaultHandler";

    pub fn new(
        rules: Rules,
        options: SharedOptions,
        filters: Box<dyn FilterLibrary>,
        validator: Box<dyn Validator>,
        translator: SharedTranslator,
    ) -> Self {
        Self {
            rules,
            options,
            filters,
            validator,
            translator,
            errors: Vec::new(),
            info: None,
            needs_refresh_info: false,
        }
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn options(&self) -> &SharedOptions {
        &self.options
    }

    fn option(&self, option: OptionName) -> bool {
        self.options.get_bool_option(option)
    }

    fn normalize(&mut self, data: Value) -> Option<Vec<Record>> {
        let entries = match data {
            Value::Map(map) if map.keys().any(|key| !is_batch_index(key)) => {
                return Some(vec![map]);
            }
            Value::Map(map) => map.into_values().collect(),
            Value::List(items) => items,
            scalar => vec![scalar],
        };
        if entries.iter().any(|entry| !matches!(entry, Value::Map(_))) {
            let message = self
                .translator
                .translate("Incorrect array format (need key=>value)")
                .into_owned();
            self.errors.push(message);
            return None;
        }
        Some(
            entries
                .into_iter()
                .filter_map(|entry| match entry {
                    Value::Map(record) => Some(record),
                    _ => None,
                })
                .collect(),
        )
    }

    fn fill_defaults(&mut self, batch: &mut [Record]) {
        let delete_redundant = self.option(OptionName::DeleteRedundant);
        for record in batch.iter_mut() {
            for (field, rules) in self.rules.iter() {
                if record.contains_key(field) {
                    continue;
                }
                match rules.default_value() {
                    Some(default) => {
                        record.insert(field.to_string(), default.clone());
                    }
                    None => {
                        let message = format!(
                            "{} {} {} {}",
                            self.translator.translate("Key"),
                            field,
                            self.translator.translate("not found in"),
                            self.rules.name()
                        );
                        self.errors.push(message);
                    }
                }
            }
            if delete_redundant {
                record.retain(|field, _| self.rules.contains(field));
            }
        }
    }

    /// Returns `Ok(false)` when any rule failed.
    fn validate(&mut self, batch: &[Record]) -> Result<bool> {
        if self.option(OptionName::SkipValidation) {
            return Ok(true);
        }
        if let Err(err) = self.register_fields(batch) {
            self.validator.reset();
            return Err(err);
        }
        let passed = self.validator.validate();
        if !passed {
            self.errors.extend_from_slice(self.validator.messages());
        }
        self.validator.reset();
        Ok(passed)
    }

    fn register_fields(&mut self, batch: &[Record]) -> Result<()> {
        for record in batch {
            for (field, value) in record {
                let Some(rules) = self.rules.get(field) else {
                    continue;
                };
                let Some(spec) = rules.validate() else {
                    continue;
                };
                let spec = spec
                    .as_str()
                    .ok_or_else(|| malformed(&self.rules, field, Directive::Validate))?;
                let label = field_label(&self.rules, field, rules)?;
                self.validator.set_full_rule(field, value, spec, label)?;
            }
        }
        Ok(())
    }

    fn apply_filters(&mut self, batch: &mut [Record]) -> Result<()> {
        if self.option(OptionName::SkipFilters) {
            return Ok(());
        }
        for record in batch.iter_mut() {
            for (field, slot) in record.iter_mut() {
                let Some(rules) = self.rules.get(field) else {
                    continue;
                };
                for (directive, options) in rules.iter() {
                    let Some(op) = FilterOp::for_directive(directive) else {
                        continue;
                    };
                    if self.options.is_filter_skipped(directive.as_str()) {
                        continue;
                    }
                    trace!(
                        field = field.as_str(),
                        directive = directive.as_str(),
                        "applying filter"
                    );
                    let current = std::mem::take(slot);
                    *slot = self.filters.apply(op, field, current, options)?;
                }
            }
        }
        if let Some(errors) = self.filters.errors() {
            self.errors.extend_from_slice(errors);
        }
        self.filters.clear_errors();
        Ok(())
    }

    fn hide(&self, batch: &mut [Record]) {
        for record in batch.iter_mut() {
            record.retain(|field, _| !self.rules.get(field).is_some_and(FieldRules::is_hidden));
        }
    }
}

impl EntityHandler for DefaultHandler {
    fn handle(&mut self, data: Value, info: Option<&Info>) -> Result<Option<Value>> {
        let mut seeded = info.cloned().unwrap_or_default();
        seeded.insert("rules".to_string(), self.rules.to_value());
        self.info = Some(seeded);
        self.needs_refresh_info = true;

        let Some(mut batch) = self.normalize(data) else {
            debug!(rules = self.rules.name(), "input is not a record or batch");
            return Ok(None);
        };
        debug!(rules = self.rules.name(), records = batch.len(), "normalized");

        self.fill_defaults(&mut batch);
        if self.option(OptionName::ReturnIfNotExistsErrors) && !self.errors.is_empty() {
            debug!(errors = self.errors.len(), "returning after default fill");
            return Ok(Some(into_batch(batch)));
        }

        let passed = self.validate(&batch)?;
        if !passed && self.option(OptionName::ReturnIfValidationErrors) {
            debug!(errors = self.errors.len(), "returning after validation");
            return Ok(Some(into_batch(batch)));
        }

        self.apply_filters(&mut batch)?;
        self.hide(&mut batch);
        debug!(
            rules = self.rules.name(),
            errors = self.errors.len(),
            "default handler finished"
        );
        Ok(Some(into_batch(batch)))
    }

    fn errors(&self) -> Option<&[String]> {
        if self.errors.is_empty() {
            None
        } else {
            Some(&self.errors)
        }
    }

    fn clear_errors(&mut self) {
        self.errors.clear();
    }

    fn info(&self) -> Option<&Info> {
        self.info.as_ref()
    }

    fn needs_refresh_info(&self) -> bool {
        self.needs_refresh_info
    }
}

/// Canonical non-negative integer: `"0"`, `"12"`, but not `"01"` or `"-1"`.
pub fn is_batch_index(key: &str) -> bool {
    !key.is_empty()
        && key.bytes().all(|byte| byte.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'))
}

fn into_batch(batch: Vec<Record>) -> Value {
    Value::List(batch.into_iter().map(Value::Map).collect())
}

fn field_label<'a>(rules: &Rules, field: &'a str, field_rules: &'a FieldRules) -> Result<&'a str> {
    match field_rules.label() {
        None | Some(Value::Null) => Ok(field),
        Some(Value::String(label)) => Ok(label.as_str()),
        Some(_) => Err(malformed(rules, field, Directive::Label)),
    }
}

fn malformed(rules: &Rules, field: &str, directive: Directive) -> EntifyError {
    EntifyError::MalformedDirective {
        rules: rules.name().to_string(),
        field: field.to_string(),
        directive: directive.as_str(),
        expected: "a string",
    }
}

#[cfg(test)]
mod tests {
    use entify_model::{EntityOptions, passthrough, record_of};
    use entify_validate::StandardValidator;
    use indexmap::IndexMap;

    use super::*;
    use crate::filters::DefaultFilterLibrary;

    fn handler(rules: Rules, options: EntityOptions) -> DefaultHandler {
        let name = rules.name().to_string();
        DefaultHandler::new(
            rules,
            SharedOptions::new(options),
            Box::new(DefaultFilterLibrary::new(name)),
            Box::new(StandardValidator::default()),
            passthrough(),
        )
    }

    fn rules(fields: Vec<(&str, FieldRules)>) -> Rules {
        let fields: IndexMap<String, FieldRules> = fields
            .into_iter()
            .map(|(name, rules)| (name.to_string(), rules))
            .collect();
        Rules::new("people", fields)
    }

    fn records(value: Option<Value>) -> Vec<Record> {
        match value {
            Some(Value::List(items)) => items
                .into_iter()
                .map(|item| item.as_map().cloned().unwrap())
                .collect(),
            other => panic!("expected a batch, got {other:?}"),
        }
    }

    #[test]
    fn single_record_becomes_one_element_batch() {
        let mut handler = handler(
            rules(vec![("name", FieldRules::new().with(Directive::Validate, ""))]),
            EntityOptions::default(),
        );
        let record = Value::Map(record_of([("name", "Joe")]));
        let batch = records(handler.handle(record, None).unwrap());
        assert_eq!(batch, vec![record_of([("name", "Joe")])]);
    }

    #[test]
    fn index_keyed_map_is_a_batch() {
        let mut handler = handler(
            rules(vec![("name", FieldRules::new())]),
            EntityOptions::default(),
        );
        let data = Value::Map(record_of([
            ("0", Value::Map(record_of([("name", "Ann")]))),
            ("1", Value::Map(record_of([("name", "Bob")]))),
        ]));
        let batch = records(handler.handle(data, None).unwrap());
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1]["name"], Value::from("Bob"));
    }

    #[test]
    fn non_record_entries_abort_with_format_error() {
        let mut handler = handler(rules(vec![]), EntityOptions::default());
        let data = Value::List(vec![Value::Map(record_of([("a", 1)])), Value::Int(3)]);
        assert!(handler.handle(data, None).unwrap().is_none());
        assert_eq!(
            handler.errors(),
            Some(&["Incorrect array format (need key=>value)".to_string()][..])
        );
        assert!(handler.info().unwrap().contains_key("rules"));
        assert!(handler.needs_refresh_info());
    }

    #[test]
    fn batch_index_keys_must_be_canonical() {
        assert!(is_batch_index("0"));
        assert!(is_batch_index("17"));
        assert!(!is_batch_index("01"));
        assert!(!is_batch_index("-1"));
        assert!(!is_batch_index("name"));
    }

    #[test]
    fn defaults_fill_and_missing_fields_short_circuit() {
        let mut handler = handler(
            rules(vec![
                (
                    "role",
                    FieldRules::new()
                        .with(Directive::Validate, "in:admin,user")
                        .with(Directive::Default, "user"),
                ),
                (
                    "name",
                    FieldRules::new()
                        .with(Directive::Validate, "required")
                        .with(Directive::Label, "Name"),
                ),
                ("secret", FieldRules::new().with(Directive::Hide, true)),
            ]),
            EntityOptions::default(),
        );
        let data = Value::Map(record_of([("secret", "x"), ("extra", "dropped")]));
        let batch = records(handler.handle(data, None).unwrap());

        assert_eq!(batch, vec![record_of([("secret", "x"), ("role", "user")])]);
        assert_eq!(
            handler.errors(),
            Some(&["Key name not found in people".to_string()][..])
        );
    }

    #[test]
    fn undeclared_fields_survive_without_delete_redundant() {
        let mut options = EntityOptions::default();
        options.set_delete_redundant(false);
        let mut handler = handler(
            rules(vec![("name", FieldRules::new().with(Directive::Validate, ""))]),
            options,
        );
        let data = Value::Map(record_of([("name", "Ann"), ("extra", "kept")]));
        let batch = records(handler.handle(data, None).unwrap());
        assert_eq!(batch, vec![record_of([("name", "Ann"), ("extra", "kept")])]);
        assert!(handler.errors().is_none());
    }

    #[test]
    fn missing_fields_can_continue_through_validation_and_filters() {
        let mut options = EntityOptions::default();
        options.set_return_if_not_exists_errors(false);
        let mut handler = handler(
            rules(vec![
                (
                    "name",
                    FieldRules::new()
                        .with(Directive::Label, "Name")
                        .with(Directive::Validate, "required"),
                ),
                (
                    "age",
                    FieldRules::new()
                        .with(Directive::Label, "Age")
                        .with(Directive::Validate, "min:18")
                        .with(Directive::Convert, "int"),
                ),
            ]),
            options,
        );
        let data = Value::Map(record_of([("age", "12")]));
        let batch = records(handler.handle(data, None).unwrap());
        assert_eq!(batch, vec![record_of([("age", 12)])]);
        assert_eq!(
            handler.errors().unwrap(),
            [
                "Key name not found in people".to_string(),
                "Age must be at least 18".to_string()
            ]
        );
    }

    #[test]
    fn validation_failures_can_skip_filters() {
        let mut options = EntityOptions::default();
        options.set_return_if_validation_errors(true);
        let mut handler = handler(
            rules(vec![(
                "age",
                FieldRules::new()
                    .with(Directive::Label, "Age")
                    .with(Directive::Validate, "min:18")
                    .with(Directive::Convert, "int"),
            )]),
            options,
        );
        let data = Value::Map(record_of([("age", "12")]));
        let batch = records(handler.handle(data, None).unwrap());
        assert_eq!(batch[0]["age"], Value::from("12"));
        assert_eq!(handler.errors().unwrap(), ["Age must be at least 18".to_string()]);
    }

    #[test]
    fn filters_chain_in_declaration_order() {
        let mut handler = handler(
            rules(vec![(
                "skills",
                FieldRules::new()
                    .with(Directive::Validate, "")
                    .with(Directive::Convert, "int")
                    .with(
                        Directive::Check,
                        Value::callable(|value| {
                            if value.as_i64().is_some() {
                                Value::Bool(true)
                            } else {
                                Value::from("not an int")
                            }
                        }),
                    )
                    .with(
                        Directive::Filter,
                        Value::callable(|value| Value::Int(value.as_i64().unwrap_or(0) * 2)),
                    ),
            )]),
            EntityOptions::default(),
        );
        let data = Value::Map(record_of([("skills", "6")]));
        let batch = records(handler.handle(data, None).unwrap());
        assert_eq!(batch[0]["skills"], Value::Int(12));
        assert!(handler.errors().is_none());
    }

    #[test]
    fn skipped_filters_are_not_applied() {
        let mut options = EntityOptions::default();
        options.skip_filter("escape");
        let mut handler = handler(
            rules(vec![(
                "bio",
                FieldRules::new()
                    .with(Directive::Escape, true)
                    .with(Directive::Allowed, "<b>"),
            )]),
            options,
        );
        let data = Value::Map(record_of([("bio", "<b>a&b</b><i>x</i>")]));
        let batch = records(handler.handle(data, None).unwrap());
        assert_eq!(batch[0]["bio"], Value::from("<b>a&b</b>x"));
    }

    #[test]
    fn hidden_fields_are_validated_then_removed() {
        let mut handler = handler(
            rules(vec![
                (
                    "password",
                    FieldRules::new()
                        .with(Directive::Label, "Password")
                        .with(Directive::Validate, "minlength:8")
                        .with(Directive::Hide, true),
                ),
                ("name", FieldRules::new()),
            ]),
            EntityOptions::default(),
        );
        let data = Value::Map(record_of([("password", "short"), ("name", "Ann")]));
        let batch = records(handler.handle(data, None).unwrap());
        assert_eq!(batch, vec![record_of([("name", "Ann")])]);
        assert_eq!(
            handler.errors().unwrap(),
            ["Password must be at least 8 characters".to_string()]
        );
    }

    #[test]
    fn incoming_info_is_kept_next_to_rules() {
        let mut handler = handler(rules(vec![("name", FieldRules::new())]), EntityOptions::default());
        let info = record_of([("page", 2)]);
        handler
            .handle(Value::Map(record_of([("name", "Ann")])), Some(&info))
            .unwrap();
        let seeded = handler.info().unwrap();
        assert_eq!(seeded["page"], Value::Int(2));
        assert!(seeded["rules"].as_map().unwrap().contains_key("name"));
    }

    #[test]
    fn malformed_validate_directive_is_fatal() {
        let mut handler = handler(
            rules(vec![("age", FieldRules::new().with(Directive::Validate, 18))]),
            EntityOptions::default(),
        );
        let err = handler
            .handle(Value::Map(record_of([("age", 20)])), None)
            .unwrap_err();
        assert!(matches!(err, EntifyError::MalformedDirective { directive: "validate", .. }));
    }
}
