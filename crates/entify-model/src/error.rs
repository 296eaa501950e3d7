//! Fatal (configuration and programming) errors.
//!
//! Recoverable data problems never use this type; they are collected as
//! message strings next to the processed records.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EntifyError {
    // === Filter directives ===
    /// Directive option of the wrong shape (`check: 5`, `escape: "yes"`).
    #[error("{rules}, {field} {filter} filter value must be {expected}")]
    InvalidDirective {
        rules: String,
        field: String,
        filter: &'static str,
        expected: &'static str,
    },

    /// Field value of the wrong kind for a filter that requires one.
    #[error("{rules}, {field} value must be {expected}")]
    InvalidValue {
        rules: String,
        field: String,
        expected: &'static str,
    },

    #[error("{rules}, {field} check filter value must be callable and return string error or true")]
    InvalidCheckResult { rules: String, field: String },

    #[error("{rules}, {field} convert allow {allowed}")]
    UnknownConversion {
        rules: String,
        field: String,
        allowed: String,
    },

    #[error("{rules}, {field} cannot convert {from} to {target}")]
    Unconvertible {
        rules: String,
        field: String,
        from: &'static str,
        target: &'static str,
    },

    /// Type assertion directive (`int: true`, `null: false`) did not hold.
    #[error("{rules}, {field} {message}")]
    KindMismatch {
        rules: String,
        field: String,
        message: String,
    },

    /// `validate` or `label` directive that is not a string.
    #[error("{rules}, {field} {directive} directive must be {expected}")]
    MalformedDirective {
        rules: String,
        field: String,
        directive: &'static str,
        expected: &'static str,
    },

    // === Rule specifications ===
    #[error("rules model not found: {model}")]
    ModelNotFound { model: String },

    #[error("rules model {model} must be a mapping of field names to directives")]
    ModelNotMapping { model: String },

    #[error("rules for {field} in {model} must be a mapping")]
    FieldNotMapping { model: String, field: String },

    #[error("param {directive} not present in {field} ({model})")]
    MissingDirective {
        model: String,
        field: String,
        directive: &'static str,
    },

    #[error("param {directive} not native in {field} ({model})")]
    UnknownDirective {
        model: String,
        field: String,
        directive: String,
    },

    // === Validation rules ===
    #[error("unknown validation rule `{rule}` for {field}")]
    UnknownValidationRule { field: String, rule: String },

    #[error("invalid argument `{argument}` for validation rule `{rule}` on {field}")]
    InvalidValidationArgument {
        field: String,
        rule: String,
        argument: String,
    },

    // === Pagination ===
    #[error("invalid pagination: {reason}")]
    InvalidPagination { reason: String },

    // === IO ===
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("render failed: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, EntifyError>;
