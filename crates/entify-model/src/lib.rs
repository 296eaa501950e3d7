//! Core data types for the entify record pipeline.
//!
//! - [`Value`] / [`Record`]: untyped field values and ordered records
//! - [`Rules`] / [`FieldRules`] / [`Directive`]: rule specifications
//! - [`EntityOptions`] / [`SharedOptions`]: boolean switches for the default handler
//! - [`Translator`]: string resources for user-visible messages
//! - [`EntifyError`]: fatal configuration errors

pub mod error;
pub mod options;
pub mod rules;
pub mod translate;
pub mod value;

pub use error::{EntifyError, Result};
pub use options::{EntityOptions, OptionName, SharedOptions};
pub use rules::{Directive, FieldRules, Rules};
pub use translate::{Catalog, Passthrough, SharedTranslator, Translator, passthrough};
pub use value::{Callable, Info, Record, Resource, Value, ValueKind, record_of};
