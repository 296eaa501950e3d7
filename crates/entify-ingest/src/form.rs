//! Submitted form data provider with file uploads.

use std::fs;
use std::path::{Path, PathBuf};

use entify_core::{EntityHandlers, EntityMain};
use entify_model::{Info, Record, Value};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::error::{IngestError, Result};

/// MIME types accepted when none are given.
pub const DEFAULT_ALLOWED_MIME: [&str; 2] = ["image/jpeg", "image/png"];

/// Upload size limit used when none is given.
pub const DEFAULT_MAX_SIZE: &str = "2M";

/// Info key holding `field → stored path`.
pub const FILES_KEY: &str = "files";

/// One uploaded file as received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub client_filename: String,
    pub content: Vec<u8>,
    /// Transfer failure reported by the client layer. Such files are skipped.
    pub error: Option<String>,
}

impl UploadedFile {
    pub fn new(client_filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            client_filename: client_filename.into(),
            content,
            error: None,
        }
    }

    pub fn failed(client_filename: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            client_filename: client_filename.into(),
            content: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// A parsed form submission.
#[derive(Debug, Clone, Default)]
pub struct FormRequest {
    pub body: Value,
    pub files: IndexMap<String, UploadedFile>,
}

impl FormRequest {
    pub fn new(body: impl Into<Value>) -> Self {
        Self {
            body: body.into(),
            files: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_file(mut self, field: impl Into<String>, file: UploadedFile) -> Self {
        self.files.insert(field.into(), file);
        self
    }
}

/// Parse a size limit such as `"2M"`, `"512k"`, `"1G"` or `"4096"` into bytes.
pub fn parse_size(value: &str) -> Result<u64> {
    let trimmed = value.trim();
    let invalid = || IngestError::InvalidSize {
        value: value.to_string(),
    };
    let (digits, multiplier) = match trimmed.chars().last().map(|ch| ch.to_ascii_lowercase()) {
        Some('g') => (&trimmed[..trimmed.len() - 1], 1024 * 1024 * 1024),
        Some('m') => (&trimmed[..trimmed.len() - 1], 1024 * 1024),
        Some('k') => (&trimmed[..trimmed.len() - 1], 1024),
        Some(_) => (trimmed, 1),
        None => return Err(invalid()),
    };
    let number: u64 = digits.trim().parse().map_err(|_| invalid())?;
    number.checked_mul(multiplier).ok_or_else(invalid)
}

/// MIME type from leading magic bytes.
pub fn sniff_mime(content: &[u8]) -> &'static str {
    if content.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if content.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        "image/png"
    } else if content.starts_with(b"GIF87a") || content.starts_with(b"GIF89a") {
        "image/gif"
    } else if content.starts_with(b"%PDF-") {
        "application/pdf"
    } else if content.len() >= 12 && &content[..4] == b"RIFF" && &content[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}

/// Provides a form submission, storing its uploads.
pub struct FormProvider {
    handlers: EntityHandlers,
    request: FormRequest,
    upload_dir: Option<PathBuf>,
    allowed_mime: Vec<String>,
    max_size: u64,
}

impl FormProvider {
    /// Without an upload directory, files in the request are ignored.
    pub fn new(
        handlers: EntityHandlers,
        request: FormRequest,
        upload_dir: Option<PathBuf>,
        allowed_mime: Vec<String>,
        max_size: &str,
    ) -> Result<Self> {
        Ok(Self {
            handlers,
            request,
            upload_dir,
            allowed_mime,
            max_size: parse_size(max_size)?,
        })
    }

    /// Provider with the default MIME allow-list and size limit.
    pub fn with_defaults(
        handlers: EntityHandlers,
        request: FormRequest,
        upload_dir: Option<PathBuf>,
    ) -> Result<Self> {
        Self::new(
            handlers,
            request,
            upload_dir,
            DEFAULT_ALLOWED_MIME.into_iter().map(String::from).collect(),
            DEFAULT_MAX_SIZE,
        )
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Store uploads, then run the handler chain over the form body.
    pub fn entity(self) -> Result<EntityMain> {
        if self.request.body.is_empty() {
            return Err(IngestError::NoData);
        }

        let info = match &self.upload_dir {
            Some(dir) => {
                let stored = self.store_uploads(dir)?;
                let mut info = Info::new();
                info.insert(FILES_KEY.to_string(), Value::Map(stored));
                Some(info)
            }
            None => None,
        };

        Ok(EntityMain::new(self.handlers, self.request.body, info, None)?)
    }

    fn store_uploads(&self, dir: &Path) -> Result<Record> {
        let mut stored = Record::new();
        if self.request.files.is_empty() {
            return Ok(stored);
        }
        check_upload_dir(dir)?;

        let mut written: Vec<PathBuf> = Vec::new();
        for (field, file) in &self.request.files {
            match self.store_one(dir, field, file) {
                Ok(Some(path)) => {
                    stored.insert(field.clone(), Value::from(path.display().to_string()));
                    written.push(path);
                }
                Ok(None) => {}
                Err(err) => {
                    for path in &written {
                        if let Err(remove_err) = fs::remove_file(path) {
                            warn!(path = %path.display(), error = %remove_err, "failed to remove upload");
                        }
                    }
                    return Err(err);
                }
            }
        }
        info!(files = stored.len(), dir = %dir.display(), "stored uploads");
        Ok(stored)
    }

    fn store_one(&self, dir: &Path, field: &str, file: &UploadedFile) -> Result<Option<PathBuf>> {
        if let Some(error) = &file.error {
            debug!(field, error = %error, "skipping failed upload");
            return Ok(None);
        }
        let name = Path::new(&file.client_filename)
            .file_name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| IngestError::InvalidFileName {
                field: field.to_string(),
                name: file.client_filename.clone(),
            })?;
        let target = dir.join(name);
        if target.exists() {
            return Err(IngestError::FileExists { path: target });
        }
        if file.size() > self.max_size {
            return Err(IngestError::FileTooLarge {
                field: field.to_string(),
                size: file.size(),
                limit: self.max_size,
            });
        }
        let mime = sniff_mime(&file.content);
        if !self.allowed_mime.iter().any(|allowed| allowed == mime) {
            return Err(IngestError::FileTypeNotAllowed {
                field: field.to_string(),
                mime: mime.to_string(),
            });
        }
        fs::write(&target, &file.content).map_err(|source| IngestError::Write {
            path: target.clone(),
            source,
        })?;
        debug!(field, path = %target.display(), mime, "stored upload");
        Ok(Some(target))
    }
}

fn check_upload_dir(dir: &Path) -> Result<()> {
    let metadata = fs::metadata(dir).map_err(|_| IngestError::UploadDirMissing {
        path: dir.to_path_buf(),
    })?;
    if !metadata.is_dir() {
        return Err(IngestError::UploadDirMissing {
            path: dir.to_path_buf(),
        });
    }
    if metadata.permissions().readonly() {
        return Err(IngestError::UploadDirNotWritable {
            path: dir.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_suffixes_scale_by_1024() {
        assert_eq!(parse_size("2M").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_size("512k").unwrap(), 512 * 1024);
        assert_eq!(parse_size(" 1G ").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert!(parse_size("").is_err());
        assert!(parse_size("lots").is_err());
    }

    #[test]
    fn mime_sniffing_reads_magic_bytes() {
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(
            sniff_mime(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0]),
            "image/png"
        );
        assert_eq!(sniff_mime(b"%PDF-1.7"), "application/pdf");
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(b"hello"), "application/octet-stream");
    }
}
