//! Input file classification
//!
//! Maps a raw file to a category from its extension and MIME hint. Pure and
//! stateless: the same file always lands in the same category.
//!
//! Decision order:
//! 1. Primary media (configured extension set or `audio/*` MIME)
//! 2. Caption/subtitle
//! 3. Plain-text analysis
//! 4. Unknown

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::RawFile;

/// File category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Main media file
    Primary,
    /// Caption/subtitle sidecar
    Caption,
    /// Analysis-text sidecar
    AnalysisText,
    /// Not recognized; excluded from matching and output
    Unknown,
}

const CAPTION_EXTENSIONS: &[&str] = &["vtt", "srt", "lrc", "ass", "ssa", "sbv", "ttml", "dfxp"];
const CAPTION_MIME_TYPES: &[&str] = &[
    "text/vtt",
    "application/x-subrip",
    "text/x-ssa",
    "application/ttml+xml",
];
const ANALYSIS_EXTENSIONS: &[&str] = &["txt", "text"];

/// File classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    primary_extensions: HashSet<String>,
}

impl Classifier {
    /// Create classifier for the given primary extensions (with or without dot)
    pub fn new<S: AsRef<str>>(primary_extensions: &[S]) -> Self {
        Self {
            primary_extensions: primary_extensions
                .iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Classify a file
    pub fn classify(&self, file: &dyn RawFile) -> Category {
        self.classify_parts(file.name(), file.mime_hint())
    }

    /// Classify from a name and optional MIME hint
    pub fn classify_parts(&self, name: &str, mime_hint: Option<&str>) -> Category {
        let ext = extension(name);
        let mime = mime_hint
            .map(|m| m.split(';').next().unwrap_or(m).trim().to_lowercase())
            .filter(|m| !m.is_empty());
        let mime = mime.as_deref();

        let ext_is = |set: &[&str]| ext.as_deref().is_some_and(|e| set.contains(&e));

        if ext.as_deref().is_some_and(|e| self.primary_extensions.contains(e))
            || mime.is_some_and(|m| m.starts_with("audio/"))
        {
            Category::Primary
        } else if ext_is(CAPTION_EXTENSIONS) || mime.is_some_and(|m| CAPTION_MIME_TYPES.contains(&m)) {
            Category::Caption
        } else if ext_is(ANALYSIS_EXTENSIONS) || mime == Some("text/plain") {
            Category::AnalysisText
        } else {
            Category::Unknown
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&mfl_common::config::default_primary_extensions())
    }
}

/// Lower-cased final extension segment, if any
fn extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.trim().to_lowercase();
    (!ext.is_empty()).then_some(ext)
}
