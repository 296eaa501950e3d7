//! Data providers for the entify record pipeline.
//!
//! A provider holds raw data plus a handler chain and builds the
//! [`entify_core::EntityMain`] that runs it:
//! - [`ArrayProvider`]: in-memory batches, with pagination
//! - [`FormProvider`]: form submissions, with file uploads
//!
//! [`Entification`] builds either provider from a model name or inline rules.

pub mod array;
pub mod entification;
pub mod error;
pub mod form;

pub use array::{ArrayProvider, PAGINATION_KEY};
pub use entification::{Entification, INLINE_RULES_NAME, RulesSource};
pub use error::{IngestError, Result};
pub use form::{
    DEFAULT_ALLOWED_MIME, DEFAULT_MAX_SIZE, FILES_KEY, FormProvider, FormRequest, UploadedFile,
    parse_size, sniff_mime,
};
