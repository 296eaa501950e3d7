//! String resources for user-visible messages.
//!
//! Components that produce error text take a [`SharedTranslator`] instead of
//! calling a global lookup. Keys are the English source strings.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{EntifyError, Result};

/// Resolves a source string to its localized form.
pub trait Translator: Send + Sync {
    fn translate<'a>(&'a self, text: &'a str) -> Cow<'a, str>;
}

pub type SharedTranslator = Arc<dyn Translator>;

/// Returns every string unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl Translator for Passthrough {
    fn translate<'a>(&'a self, text: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(text)
    }
}

/// Shared passthrough translator.
pub fn passthrough() -> SharedTranslator {
    Arc::new(Passthrough)
}

/// Lookup table of translations; missing keys fall back to the source string.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: HashMap<String, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, source: impl Into<String>, translated: impl Into<String>) -> Self {
        self.entries.insert(source.into(), translated.into());
        self
    }

    /// Load a catalog from a JSON object of `source → translation`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EntifyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| EntifyError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Translator for Catalog {
    fn translate<'a>(&'a self, text: &'a str) -> Cow<'a, str> {
        match self.entries.get(text) {
            Some(translated) => Cow::Borrowed(translated),
            None => Cow::Borrowed(text),
        }
    }
}
