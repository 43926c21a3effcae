//! Supporting payload types for load events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of one loaded entry
///
/// Carried by `FileProcessed`, `ProgressiveUpdate` and `LoadCompleted`.
/// Snapshots are detached copies; later enrichment of the entry does not
/// change a snapshot that has already been emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySummary {
    /// Primary file name (as supplied, not normalized)
    pub file_name: String,
    /// Primary file size in bytes
    pub file_size: u64,
    /// Display title (tag title, override, or filename-derived guess)
    pub title: String,
    /// Artist, if known
    pub artist: Option<String>,
    /// Album, if known
    pub album: Option<String>,
    /// Whether embedded artwork was found
    #[serde(default)]
    pub has_artwork: bool,
    /// Duration in seconds (0.0 when unknown or probe timed out)
    pub duration_seconds: f64,
    /// Whether enrichment has been applied
    pub enriched: bool,
    /// Matched caption sidecar file name
    pub caption_file: Option<String>,
    /// Matched analysis-text sidecar file name
    pub analysis_file: Option<String>,
    /// Number of parsed analysis fields (0 when no analysis)
    #[serde(default)]
    pub analysis_fields: usize,
    /// When the entry was created
    pub loaded_at: DateTime<Utc>,
}

/// Progressive delivery phase
///
/// Serialized as the numbers 1, 2, 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ProgressivePhase {
    /// Stub entries materialized, nothing enriched yet
    Stubs,
    /// Priority subset enriched
    Priority,
    /// All enrichment finished and post-processed
    Complete,
}

impl From<ProgressivePhase> for u8 {
    fn from(phase: ProgressivePhase) -> Self {
        match phase {
            ProgressivePhase::Stubs => 1,
            ProgressivePhase::Priority => 2,
            ProgressivePhase::Complete => 3,
        }
    }
}

impl TryFrom<u8> for ProgressivePhase {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ProgressivePhase::Stubs),
            2 => Ok(ProgressivePhase::Priority),
            3 => Ok(ProgressivePhase::Complete),
            other => Err(format!("Unknown progressive phase: {}", other)),
        }
    }
}
