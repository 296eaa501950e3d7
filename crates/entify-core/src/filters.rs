//! Per-field filter operations.
//!
//! A filter receives the field name, the current value and the directive's
//! option value, and returns the new value. `check` failures are collected
//! as messages; every other contract violation is a fatal [`EntifyError`].

use std::collections::HashSet;
use std::sync::OnceLock;

use entify_model::{
    Directive, EntifyError, Result, SharedTranslator, Value, ValueKind, passthrough,
};
use regex::Regex;

/// Target types accepted by the `convert` directive.
pub const CONVERSIONS: [&str; 5] = ["string", "int", "float", "double", "bool"];

/// Runtime kinds that a type assertion directive can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindCheck {
    String,
    Int,
    Float,
    Bool,
    Null,
    /// Matches lists.
    Array,
    /// Matches maps.
    Object,
    Resource,
    Callable,
}

impl KindCheck {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Null => "null",
            Self::Array => "array",
            Self::Object => "object",
            Self::Resource => "resource",
            Self::Callable => "callable",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        let kind = value.kind();
        match self {
            Self::String => kind == ValueKind::String,
            Self::Int => kind == ValueKind::Int,
            Self::Float => kind == ValueKind::Float,
            Self::Bool => kind == ValueKind::Bool,
            Self::Null => kind == ValueKind::Null,
            Self::Array => kind == ValueKind::List,
            Self::Object => kind == ValueKind::Map,
            Self::Resource => kind == ValueKind::Resource,
            Self::Callable => kind == ValueKind::Callable,
        }
    }
}

/// A filter operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Check,
    Filter,
    Escape,
    Allowed,
    Convert,
    Kind(KindCheck),
}

impl FilterOp {
    /// Operation bound to a directive, if any. `validate`, `label`,
    /// `default`, `render`, `hide`, `meta` and `unique` have none.
    pub fn for_directive(directive: Directive) -> Option<Self> {
        let op = match directive {
            Directive::Check => Self::Check,
            Directive::Filter => Self::Filter,
            Directive::Escape => Self::Escape,
            Directive::Allowed => Self::Allowed,
            Directive::Convert => Self::Convert,
            Directive::String => Self::Kind(KindCheck::String),
            Directive::Int => Self::Kind(KindCheck::Int),
            Directive::Float => Self::Kind(KindCheck::Float),
            Directive::Null => Self::Kind(KindCheck::Null),
            Directive::Array => Self::Kind(KindCheck::Array),
            Directive::Object => Self::Kind(KindCheck::Object),
            Directive::Resource => Self::Kind(KindCheck::Resource),
            Directive::Callable => Self::Kind(KindCheck::Callable),
            Directive::Validate
            | Directive::Label
            | Directive::Default
            | Directive::Render
            | Directive::Hide
            | Directive::Meta
            | Directive::Unique => return None,
        };
        Some(op)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Filter => "filter",
            Self::Escape => "escape",
            Self::Allowed => "allowed",
            Self::Convert => "convert",
            Self::Kind(kind) => kind.as_str(),
        }
    }
}

/// Executes filter operations for one rules model.
pub trait FilterLibrary {
    fn apply(&mut self, op: FilterOp, field: &str, value: Value, options: &Value)
    -> Result<Value>;

    /// Collected `check` messages, or `None` when there are none.
    fn errors(&self) -> Option<&[String]>;

    fn clear_errors(&mut self);
}

/// Built-in filter operations.
pub struct DefaultFilterLibrary {
    rules_name: String,
    translator: SharedTranslator,
    errors: Vec<String>,
}

impl DefaultFilterLibrary {
    pub fn new(rules_name: impl Into<String>) -> Self {
        Self::with_translator(rules_name, passthrough())
    }

    pub fn with_translator(rules_name: impl Into<String>, translator: SharedTranslator) -> Self {
        Self {
            rules_name: rules_name.into(),
            translator,
            errors: Vec::new(),
        }
    }

    pub fn rules_name(&self) -> &str {
        &self.rules_name
    }

    fn check(&mut self, field: &str, value: Value, options: &Value) -> Result<Value> {
        let callable = match options {
            Value::Bool(false) => return Ok(value),
            Value::Callable(callable) => callable,
            _ => return Err(self.invalid_directive(field, "check", "callable or false")),
        };
        match callable.call(&value) {
            Value::Bool(true) => {}
            Value::String(message) => self.errors.push(message),
            _ => {
                return Err(EntifyError::InvalidCheckResult {
                    rules: self.rules_name.clone(),
                    field: field.to_string(),
                });
            }
        }
        Ok(value)
    }

    fn filter(&self, field: &str, value: Value, options: &Value) -> Result<Value> {
        match options {
            Value::Bool(false) => Ok(value),
            Value::Callable(callable) => Ok(callable.call(&value)),
            _ => Err(self.invalid_directive(field, "filter", "callable or false")),
        }
    }

    fn escape(&self, field: &str, value: Value, options: &Value) -> Result<Value> {
        let Value::Bool(enabled) = options else {
            return Err(self.invalid_directive(field, "escape", "bool"));
        };
        let Value::String(text) = value else {
            return Err(self.invalid_value(field, "string"));
        };
        if !enabled {
            return Ok(Value::String(text));
        }
        Ok(Value::String(escape_html(&text)))
    }

    fn allowed(&self, field: &str, value: Value, options: &Value) -> Result<Value> {
        let allowed = match options {
            Value::Null => None,
            Value::String(tags) => Some(tags.as_str()),
            _ => return Err(self.invalid_directive(field, "allowed", "string or null")),
        };
        let Value::String(text) = value else {
            return Err(self.invalid_value(field, "string"));
        };
        Ok(Value::String(strip_tags(&text, allowed)))
    }

    fn convert(&self, field: &str, value: Value, options: &Value) -> Result<Value> {
        let target = options
            .as_str()
            .filter(|target| CONVERSIONS.contains(target))
            .ok_or_else(|| EntifyError::UnknownConversion {
                rules: self.rules_name.clone(),
                field: field.to_string(),
                allowed: CONVERSIONS.join(", "),
            })?;
        let unconvertible = |target: &'static str| EntifyError::Unconvertible {
            rules: self.rules_name.clone(),
            field: field.to_string(),
            from: value.kind().as_str(),
            target,
        };

        let converted = match target {
            "bool" => Value::Bool(value.truthy()),
            "string" => match value.as_text() {
                Some(text) => Value::String(text.into_owned()),
                None => return Err(unconvertible("string")),
            },
            "int" => match to_int(&value) {
                Some(number) => Value::Int(number),
                None => return Err(unconvertible("int")),
            },
            _ => match to_float(&value) {
                Some(number) => Value::Float(number),
                None => return Err(unconvertible("float")),
            },
        };
        Ok(converted)
    }

    fn kind(&self, field: &str, kind: KindCheck, value: Value, options: &Value) -> Result<Value> {
        let expected = match options {
            Value::Null => return Ok(value),
            Value::Bool(expected) => *expected,
            _ => return Err(self.invalid_directive(field, kind.as_str(), "bool or null")),
        };
        if kind.matches(&value) != expected {
            let template = if expected { "must be" } else { "must not be" };
            return Err(EntifyError::KindMismatch {
                rules: self.rules_name.clone(),
                field: field.to_string(),
                message: format!("{} {}", self.translator.translate(template), kind.as_str()),
            });
        }
        Ok(value)
    }

    fn invalid_directive(
        &self,
        field: &str,
        filter: &'static str,
        expected: &'static str,
    ) -> EntifyError {
        EntifyError::InvalidDirective {
            rules: self.rules_name.clone(),
            field: field.to_string(),
            filter,
            expected,
        }
    }

    fn invalid_value(&self, field: &str, expected: &'static str) -> EntifyError {
        EntifyError::InvalidValue {
            rules: self.rules_name.clone(),
            field: field.to_string(),
            expected,
        }
    }
}

impl FilterLibrary for DefaultFilterLibrary {
    fn apply(
        &mut self,
        op: FilterOp,
        field: &str,
        value: Value,
        options: &Value,
    ) -> Result<Value> {
        match op {
            FilterOp::Check => self.check(field, value, options),
            FilterOp::Filter => self.filter(field, value, options),
            FilterOp::Escape => self.escape(field, value, options),
            FilterOp::Allowed => self.allowed(field, value, options),
            FilterOp::Convert => self.convert(field, value, options),
            FilterOp::Kind(kind) => self.kind(field, kind, value, options),
        }
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
}

/// Escape the five HTML special characters.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn markup_pattern() -> &'static Regex {
    static MARKUP: OnceLock<Regex> = OnceLock::new();
    MARKUP.get_or_init(|| {
        Regex::new(r"(?s)<!--.*?-->|<[!?][^>]*>|</?\s*([A-Za-z][A-Za-z0-9:-]*)[^>]*>")
            .expect("markup pattern is valid")
    })
}

/// Remove comments and tags, keeping tags named in `allowed` (`"<b><i>"`).
pub fn strip_tags(text: &str, allowed: Option<&str>) -> String {
    let keep: HashSet<String> = allowed
        .map(|tags| {
            tags.split(['<', '>'])
                .map(|name| name.trim().trim_start_matches('/').to_ascii_lowercase())
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default();

    markup_pattern()
        .replace_all(text, |captures: &regex::Captures<'_>| {
            let kept = captures
                .get(1)
                .is_some_and(|name| keep.contains(&name.as_str().to_ascii_lowercase()));
            if kept {
                captures[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Leading numeric prefix after whitespace (`" 12.5kg"` → `"12.5"`).
fn numeric_prefix(text: &str) -> &str {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let fraction_start = end + 1;
        let mut cursor = fraction_start;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if has_digits || cursor > fraction_start {
            has_digits = true;
            end = cursor;
        }
    }
    if !has_digits {
        return "";
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut cursor = end + 1;
        if cursor < bytes.len() && (bytes[cursor] == b'+' || bytes[cursor] == b'-') {
            cursor += 1;
        }
        let exponent_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if cursor > exponent_start {
            end = cursor;
        }
    }
    &text[..end]
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::Int(number) => Some(*number as f64),
        Value::Float(number) => Some(*number),
        Value::String(text) => Some(numeric_prefix(text).parse::<f64>().unwrap_or(0.0)),
        _ => None,
    }
}

fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(number) => Some(*number),
        Value::String(text) => {
            let prefix = numeric_prefix(text);
            match prefix.parse::<i64>() {
                Ok(number) => Some(number),
                Err(_) => Some(float_to_int(prefix.parse::<f64>().unwrap_or(0.0))),
            }
        }
        other => to_float(other).map(float_to_int),
    }
}

fn float_to_int(number: f64) -> i64 {
    if number.is_finite() {
        number.trunc() as i64
    } else {
        0
    }
}
