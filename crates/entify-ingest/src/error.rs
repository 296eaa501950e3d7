//! Error types for data providers.

use std::path::PathBuf;

use entify_model::EntifyError;
use thiserror::Error;

/// Errors raised while building an entity from a data source.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Rules, filter or pagination error from the pipeline.
    #[error(transparent)]
    Pipeline(#[from] EntifyError),

    // === Form Errors ===
    /// The submitted form carried no fields.
    #[error("no data provided")]
    NoData,

    /// Upload size limit that is not `<number>[k|m|g]`.
    #[error("invalid size limit '{value}'")]
    InvalidSize { value: String },

    // === Upload Errors ===
    #[error("upload directory does not exist: {path}")]
    UploadDirMissing { path: PathBuf },

    #[error("upload directory is not writable: {path}")]
    UploadDirNotWritable { path: PathBuf },

    /// Client file name without a usable base name (`..`, empty).
    #[error("invalid upload file name '{name}' for {field}")]
    InvalidFileName { field: String, name: String },

    #[error("file already exists: {path}")]
    FileExists { path: PathBuf },

    #[error("file for {field} is {size} bytes, limit is {limit}")]
    FileTooLarge { field: String, size: u64, limit: u64 },

    #[error("file type {mime} not allowed for {field}")]
    FileTypeNotAllowed { field: String, mime: String },

    #[error("failed to write upload {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for ingest operations.
pub type Result<T> = std::result::Result<T, IngestError>;
