//! Pipeline output entries
//!
//! An entry is created in stub form (filename-derived title, sidecars
//! attached, `enriched == false`) and later receives exactly one enrichment
//! from the operation that owns it.

use chrono::{DateTime, Utc};
use mfl_common::events::EntrySummary;
use serde::{Deserialize, Serialize};

use crate::models::FileHandle;
use crate::services::analysis_parser::StructuredAnalysis;

/// Where an entry's metadata came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSource {
    /// Guessed from the file name
    Filename,
    /// Read from embedded tags
    Tags,
}

/// Embedded cover art
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    /// MIME type if the tag declares one
    pub mime_type: Option<String>,
    /// Raw image bytes
    pub data: Vec<u8>,
}

/// Descriptive metadata for a primary file
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    /// Track title
    pub title: String,
    /// Artist name(s)
    pub artist: Option<String>,
    /// Album title
    pub album: Option<String>,
    /// Track number
    pub track_number: Option<u32>,
    /// Release year
    pub year: Option<u32>,
    /// Genre
    pub genre: Option<String>,
    /// Embedded cover art
    pub artwork: Option<Artwork>,
    /// Provenance
    pub source: MetadataSource,
}

impl TrackMetadata {
    /// Default metadata guessed from a file name
    ///
    /// `"Artist - Title.mp3"` splits into artist and title; anything else
    /// becomes the title with underscores turned into spaces.
    pub fn from_filename(file_name: &str) -> Self {
        let stem = match file_name.rfind('.') {
            Some(idx) if idx > 0 => &file_name[..idx],
            _ => file_name,
        };
        let cleaned = stem.replace('_', " ");
        let cleaned = cleaned.trim();

        let (artist, title) = match cleaned.split_once(" - ") {
            Some((artist, title)) if !artist.trim().is_empty() && !title.trim().is_empty() => {
                (Some(artist.trim().to_string()), title.trim().to_string())
            }
            _ => (None, cleaned.to_string()),
        };

        Self {
            title: if title.is_empty() { file_name.to_string() } else { title },
            artist,
            album: None,
            track_number: None,
            year: None,
            genre: None,
            artwork: None,
            source: MetadataSource::Filename,
        }
    }

    /// Apply store-provided overrides; unset fields keep their value
    pub fn apply_overrides(&mut self, overrides: &MetadataOverrides) {
        if let Some(title) = &overrides.title {
            self.title = title.clone();
        }
        if let Some(artist) = &overrides.artist {
            self.artist = Some(artist.clone());
        }
        if let Some(album) = &overrides.album {
            self.album = Some(album.clone());
        }
        if let Some(genre) = &overrides.genre {
            self.genre = Some(genre.clone());
        }
        if let Some(year) = overrides.year {
            self.year = Some(year);
        }
    }
}

/// User-supplied metadata corrections for one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataOverrides {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
}

/// Pipeline output unit
#[derive(Debug, Clone)]
pub struct Entry {
    /// Primary file name
    pub file_name: String,
    /// Primary file size in bytes
    pub file_size: u64,
    /// Primary file handle
    pub primary: FileHandle,
    /// Matched caption sidecar
    pub caption: Option<FileHandle>,
    /// Matched analysis-text sidecar
    pub analysis: Option<FileHandle>,
    /// Descriptive metadata
    pub metadata: TrackMetadata,
    /// Parsed analysis sidecar, if any
    pub analysis_data: Option<StructuredAnalysis>,
    /// Duration in seconds (0.0 when unknown)
    pub duration: f64,
    /// Whether enrichment has been applied
    pub enriched: bool,
    /// When the stub was created
    pub loaded_at: DateTime<Utc>,
}

impl Entry {
    /// Build the minimal stub for a primary file
    pub fn stub(
        primary: FileHandle,
        caption: Option<FileHandle>,
        analysis: Option<FileHandle>,
    ) -> Self {
        Self {
            file_name: primary.name().to_string(),
            file_size: primary.size(),
            metadata: TrackMetadata::from_filename(primary.name()),
            primary,
            caption,
            analysis,
            analysis_data: None,
            duration: 0.0,
            enriched: false,
            loaded_at: Utc::now(),
        }
    }

    /// Apply enrichment results
    ///
    /// An entry is enriched at most once; a second write is ignored and
    /// reported as `false`.
    pub fn apply_enrichment(
        &mut self,
        metadata: TrackMetadata,
        duration: f64,
        analysis: Option<StructuredAnalysis>,
    ) -> bool {
        if self.enriched {
            tracing::warn!(file = %self.file_name, "Entry already enriched, ignoring second write");
            return false;
        }

        self.metadata = metadata;
        self.duration = duration;
        self.analysis_data = analysis;
        self.enriched = true;
        true
    }

    /// Identity used for deduplication
    pub fn identity(&self) -> (&str, u64) {
        (&self.file_name, self.file_size)
    }

    /// Detached snapshot for notifications
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            file_name: self.file_name.clone(),
            file_size: self.file_size,
            title: self.metadata.title.clone(),
            artist: self.metadata.artist.clone(),
            album: self.metadata.album.clone(),
            has_artwork: self.metadata.artwork.is_some(),
            duration_seconds: self.duration,
            enriched: self.enriched,
            caption_file: self.caption.as_ref().map(|f| f.name().to_string()),
            analysis_file: self.analysis.as_ref().map(|f| f.name().to_string()),
            analysis_fields: self
                .analysis_data
                .as_ref()
                .map(|a| a.fields.len())
                .unwrap_or(0),
            loaded_at: self.loaded_at,
        }
    }
}
