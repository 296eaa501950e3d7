//! Rule-string field validation.

pub mod rule;
pub mod validator;

pub use rule::{FieldRule, parse_rules};
pub use validator::{StandardValidator, Validator};
