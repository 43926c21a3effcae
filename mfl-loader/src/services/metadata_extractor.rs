//! Embedded tag extraction
//!
//! Reads title/artist/album/track/year/genre and the first embedded picture
//! from a primary file's bytes using lofty. Parsing runs on a blocking thread
//! so large files never stall the async scheduler.

use async_trait::async_trait;
use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::Probe;
use std::io::Cursor;
use std::sync::Arc;

use crate::error::EnrichError;
use crate::models::{Artwork, MetadataSource, RawFile, TrackMetadata};

/// Extracts descriptive metadata from a primary file
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// `bytes` is the full content of `file`, read once per attempt
    async fn extract(
        &self,
        file: &dyn RawFile,
        bytes: Arc<Vec<u8>>,
    ) -> Result<TrackMetadata, EnrichError>;
}

/// lofty-backed extractor
#[derive(Debug, Clone, Default)]
pub struct LoftyMetadataExtractor;

impl LoftyMetadataExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetadataExtractor for LoftyMetadataExtractor {
    async fn extract(
        &self,
        file: &dyn RawFile,
        bytes: Arc<Vec<u8>>,
    ) -> Result<TrackMetadata, EnrichError> {
        let file_name = file.name().to_string();

        let metadata = tokio::task::spawn_blocking(move || read_tags(&file_name, &bytes))
            .await
            .map_err(|e| EnrichError::Metadata(format!("Extraction task failed: {}", e)))??;

        tracing::debug!(
            file = %file.name(),
            artist = ?metadata.artist,
            title = %metadata.title,
            source = ?metadata.source,
            "Extracted metadata"
        );

        Ok(metadata)
    }
}

fn read_tags(file_name: &str, bytes: &[u8]) -> Result<TrackMetadata, EnrichError> {
    let tagged_file = Probe::new(Cursor::new(bytes))
        .guess_file_type()
        .map_err(|e| EnrichError::Metadata(e.to_string()))?
        .read()
        .map_err(|e| EnrichError::Metadata(e.to_string()))?;

    let mut metadata = TrackMetadata::from_filename(file_name);

    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
        return Ok(metadata);
    };

    if let Some(title) = tag.title().filter(|t| !t.trim().is_empty()) {
        metadata.title = title.trim().to_string();
    }
    // Tag fields replace filename guesses only when present
    if let Some(artist) = tag.artist() {
        metadata.artist = Some(artist.to_string());
    }
    metadata.album = tag.album().map(|s| s.to_string());
    metadata.genre = tag.genre().map(|s| s.to_string());
    metadata.track_number = tag.track();
    metadata.year = tag.year();
    metadata.artwork = tag.pictures().first().map(|picture| Artwork {
        mime_type: picture.mime_type().map(|m| m.as_str().to_string()),
        data: picture.data().to_vec(),
    });
    metadata.source = MetadataSource::Tags;

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemoryFile;
    use crate::services::duration_probe::tests::wav_fixture;

    #[tokio::test]
    async fn test_untagged_wav_falls_back_to_filename() {
        let bytes = wav_fixture(1);
        let file = MemoryFile::new("Artist - Tune.wav", bytes.clone());

        let metadata = LoftyMetadataExtractor::new()
            .extract(&file, Arc::new(bytes))
            .await
            .unwrap();

        assert_eq!(metadata.title, "Tune");
        assert_eq!(metadata.artist.as_deref(), Some("Artist"));
        assert_eq!(metadata.source, MetadataSource::Filename);
        assert!(metadata.artwork.is_none());
    }

    #[tokio::test]
    async fn test_garbage_bytes_fail() {
        let bytes = b"definitely not audio data".to_vec();
        let file = MemoryFile::new("broken.mp3", bytes.clone());

        let result = LoftyMetadataExtractor::new()
            .extract(&file, Arc::new(bytes))
            .await;
        assert!(matches!(result, Err(EnrichError::Metadata(_))));
    }
}
