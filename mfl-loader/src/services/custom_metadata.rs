//! User metadata overrides
//!
//! Corrections keyed by entry identity `(file_name, file_size)`, applied after
//! extraction so they win over both tags and filename guesses.
//!
//! File format:
//! ```toml
//! [[override]]
//! file_name = "track01.mp3"
//! file_size = 4812337
//! title = "Opening"
//! artist = "The Band"
//! ```

use mfl_common::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::models::MetadataOverrides;

/// Source of per-file metadata overrides
pub trait CustomMetadataStore: Send + Sync {
    fn lookup(&self, file_name: &str, file_size: u64) -> Option<MetadataOverrides>;
}

#[derive(Debug, Deserialize)]
struct OverrideFile {
    #[serde(rename = "override", default)]
    overrides: Vec<OverrideRecord>,
}

#[derive(Debug, Deserialize)]
struct OverrideRecord {
    file_name: String,
    file_size: u64,
    #[serde(flatten)]
    fields: MetadataOverrides,
}

/// In-memory override map
#[derive(Debug, Clone, Default)]
pub struct OverrideStore {
    entries: HashMap<(String, u64), MetadataOverrides>,
}

impl OverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `[[override]]` list
    ///
    /// Later records for the same identity replace earlier ones.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: OverrideFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse overrides failed: {}", e)))?;

        let mut store = Self::new();
        for record in file.overrides {
            store.insert(record.file_name, record.file_size, record.fields);
        }
        Ok(store)
    }

    /// Load overrides from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read overrides {} failed: {}", path.display(), e))
        })?;
        let store = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), count = store.len(), "Loaded metadata overrides");
        Ok(store)
    }

    pub fn insert(&mut self, file_name: impl Into<String>, file_size: u64, overrides: MetadataOverrides) {
        self.entries.insert((file_name.into(), file_size), overrides);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CustomMetadataStore for OverrideStore {
    fn lookup(&self, file_name: &str, file_size: u64) -> Option<MetadataOverrides> {
        self.entries.get(&(file_name.to_string(), file_size)).cloned()
    }
}
