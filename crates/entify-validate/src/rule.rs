//! Parsing of `|`-separated validation rule strings.
//!
//! `"required|minlength:2|maxlength:20"` parses into three rules. A `regex:`
//! rule consumes the rest of the string, so its pattern may contain `|`.

use std::sync::OnceLock;

use entify_model::{EntifyError, Result, Value};
use regex::Regex;

/// One parsed validation rule.
#[derive(Debug, Clone)]
pub enum FieldRule {
    Required,
    Email,
    Numeric,
    Integer,
    Min(f64),
    Max(f64),
    MinLength(usize),
    MaxLength(usize),
    In(Vec<String>),
    Regex(Regex),
}

impl FieldRule {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Email => "email",
            Self::Numeric => "numeric",
            Self::Integer => "integer",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
            Self::MinLength(_) => "minlength",
            Self::MaxLength(_) => "maxlength",
            Self::In(_) => "in",
            Self::Regex(_) => "regex",
        }
    }

    /// Message template for a failure, with `{label}` and `{arg}` placeholders.
    pub fn message_template(&self) -> &'static str {
        match self {
            Self::Required => "{label} is required",
            Self::Email => "{label} must be a valid email address",
            Self::Numeric => "{label} must be numeric",
            Self::Integer => "{label} must be an integer",
            Self::Min(_) => "{label} must be at least {arg}",
            Self::Max(_) => "{label} must be at most {arg}",
            Self::MinLength(_) => "{label} must be at least {arg} characters",
            Self::MaxLength(_) => "{label} must be at most {arg} characters",
            Self::In(_) => "{label} must be one of {arg}",
            Self::Regex(_) => "{label} has an invalid format",
        }
    }

    /// Argument shown in the failure message.
    pub fn argument(&self) -> String {
        match self {
            Self::Min(bound) | Self::Max(bound) => bound.to_string(),
            Self::MinLength(length) | Self::MaxLength(length) => length.to_string(),
            Self::In(choices) => choices.join(", "),
            Self::Regex(pattern) => pattern.as_str().to_string(),
            _ => String::new(),
        }
    }

    /// Check a value. Empty values only fail `required`.
    pub fn passes(&self, value: &Value) -> bool {
        match self {
            Self::Required => !value.is_empty(),
            _ if value.is_empty() => true,
            Self::Email => text_of(value).is_some_and(|text| email_pattern().is_match(&text)),
            Self::Numeric => value.as_number().is_some(),
            Self::Integer => match value {
                Value::Int(_) => true,
                Value::String(text) => integer_pattern().is_match(text.trim()),
                _ => false,
            },
            Self::Min(bound) => value.as_number().is_some_and(|number| number >= *bound),
            Self::Max(bound) => value.as_number().is_some_and(|number| number <= *bound),
            Self::MinLength(length) => length_of(value).is_some_and(|count| count >= *length),
            Self::MaxLength(length) => length_of(value).is_some_and(|count| count <= *length),
            Self::In(choices) => {
                text_of(value).is_some_and(|text| choices.iter().any(|choice| *choice == text))
            }
            Self::Regex(pattern) => text_of(value).is_some_and(|text| pattern.is_match(&text)),
        }
    }
}

fn text_of(value: &Value) -> Option<String> {
    value.as_text().map(|text| text.into_owned())
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::List(items) => Some(items.len()),
        Value::Map(map) => Some(map.len()),
        other => other.as_text().map(|text| text.chars().count()),
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("email pattern is valid")
    })
}

fn integer_pattern() -> &'static Regex {
    static INTEGER: OnceLock<Regex> = OnceLock::new();
    INTEGER.get_or_init(|| Regex::new(r"^[+-]?\d+$").expect("integer pattern is valid"))
}

/// Parse a rule string for `field`. The empty string yields no rules.
pub fn parse_rules(field: &str, spec: &str) -> Result<Vec<FieldRule>> {
    let mut rules = Vec::new();
    let mut rest = spec.trim();

    while !rest.is_empty() {
        if let Some(pattern) = rest.strip_prefix("regex:") {
            let regex = Regex::new(pattern).map_err(|_| invalid(field, "regex", pattern))?;
            rules.push(FieldRule::Regex(regex));
            break;
        }
        let (segment, tail) = rest.split_once('|').unwrap_or((rest, ""));
        rest = tail.trim_start();

        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        rules.push(parse_segment(field, segment)?);
    }

    Ok(rules)
}

fn parse_segment(field: &str, segment: &str) -> Result<FieldRule> {
    let (name, argument) = match segment.split_once(':') {
        Some((name, argument)) => (name.trim(), Some(argument.trim())),
        None => (segment, None),
    };

    let rule = match (name, argument) {
        ("required", None) => FieldRule::Required,
        ("email", None) => FieldRule::Email,
        ("numeric", None) => FieldRule::Numeric,
        ("integer" | "int", None) => FieldRule::Integer,
        ("min", Some(arg)) => FieldRule::Min(parse_number(field, name, arg)?),
        ("max", Some(arg)) => FieldRule::Max(parse_number(field, name, arg)?),
        ("minlength", Some(arg)) => FieldRule::MinLength(parse_length(field, name, arg)?),
        ("maxlength", Some(arg)) => FieldRule::MaxLength(parse_length(field, name, arg)?),
        ("in", Some(arg)) => FieldRule::In(
            arg.split(',')
                .map(|choice| choice.trim().to_string())
                .filter(|choice| !choice.is_empty())
                .collect(),
        ),
        ("required" | "email" | "numeric" | "integer" | "int", Some(arg)) => {
            return Err(invalid(field, name, arg));
        }
        ("min" | "max" | "minlength" | "maxlength" | "in", None) => {
            return Err(invalid(field, name, ""));
        }
        _ => {
            return Err(EntifyError::UnknownValidationRule {
                field: field.to_string(),
                rule: name.to_string(),
            });
        }
    };
    Ok(rule)
}

fn parse_number(field: &str, rule: &str, argument: &str) -> Result<f64> {
    argument
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .ok_or_else(|| invalid(field, rule, argument))
}

fn parse_length(field: &str, rule: &str, argument: &str) -> Result<usize> {
    argument
        .parse::<usize>()
        .map_err(|_| invalid(field, rule, argument))
}

fn invalid(field: &str, rule: &str, argument: &str) -> EntifyError {
    EntifyError::InvalidValidationArgument {
        field: field.to_string(),
        rule: rule.to_string(),
        argument: argument.to_string(),
    }
}
