//! Duration probing
//!
//! The probe itself may fail or hang on damaged files; callers go through
//! `probe_with_timeout`, which treats both as "duration unknown" (0.0)
//! rather than an error.

use async_trait::async_trait;
use lofty::prelude::*;
use lofty::probe::Probe;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use crate::error::EnrichError;
use crate::models::RawFile;

/// Reports a primary file's playing time
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Duration in seconds
    async fn probe(&self, file: &dyn RawFile, bytes: Arc<Vec<u8>>) -> Result<f64, EnrichError>;
}

/// lofty-backed probe reading container properties
#[derive(Debug, Clone, Default)]
pub struct LoftyDurationProbe;

impl LoftyDurationProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DurationProbe for LoftyDurationProbe {
    async fn probe(&self, _file: &dyn RawFile, bytes: Arc<Vec<u8>>) -> Result<f64, EnrichError> {
        tokio::task::spawn_blocking(move || {
            let tagged_file = Probe::new(Cursor::new(&bytes[..]))
                .guess_file_type()
                .map_err(|e| EnrichError::Probe(e.to_string()))?
                .read()
                .map_err(|e| EnrichError::Probe(e.to_string()))?;
            Ok::<f64, EnrichError>(tagged_file.properties().duration().as_secs_f64())
        })
        .await
        .map_err(|e| EnrichError::Probe(format!("Probe task failed: {}", e)))?
    }
}

/// Probe with a deadline
///
/// Timeout and failure both yield 0.0; neither is reported as an error.
pub async fn probe_with_timeout(
    probe: &dyn DurationProbe,
    file: &dyn RawFile,
    bytes: Arc<Vec<u8>>,
    timeout: Duration,
) -> f64 {
    match tokio::time::timeout(timeout, probe.probe(file, bytes)).await {
        Ok(Ok(seconds)) if seconds.is_finite() && seconds >= 0.0 => seconds,
        Ok(Ok(seconds)) => {
            tracing::debug!(file = %file.name(), seconds, "Probe returned invalid duration");
            0.0
        }
        Ok(Err(e)) => {
            tracing::debug!(file = %file.name(), error = %e, "Duration probe failed");
            0.0
        }
        Err(_) => {
            let err = EnrichError::Timeout {
                operation: "Duration probe".to_string(),
                timeout_ms: timeout.as_millis() as u64,
            };
            tracing::debug!(file = %file.name(), error = %err, "Using unknown duration");
            0.0
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::MemoryFile;

    /// Silent mono 8 kHz WAV of the given length
    pub(crate) fn wav_fixture(seconds: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..(8000 * seconds) {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    struct StalledProbe;

    #[async_trait]
    impl DurationProbe for StalledProbe {
        async fn probe(&self, _file: &dyn RawFile, _bytes: Arc<Vec<u8>>) -> Result<f64, EnrichError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(42.0)
        }
    }

    #[tokio::test]
    async fn test_wav_duration() {
        let bytes = Arc::new(wav_fixture(2));
        let file = MemoryFile::new("tone.wav", bytes.as_ref().clone());

        let seconds = LoftyDurationProbe::new().probe(&file, bytes).await.unwrap();
        assert!((seconds - 2.0).abs() < 0.01, "got {}", seconds);
    }

    #[tokio::test]
    async fn test_failure_yields_zero() {
        let bytes = Arc::new(b"garbage".to_vec());
        let file = MemoryFile::new("broken.flac", bytes.as_ref().clone());

        let seconds =
            probe_with_timeout(&LoftyDurationProbe::new(), &file, bytes, Duration::from_secs(1))
                .await;
        assert_eq!(seconds, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_zero() {
        let file = MemoryFile::new("slow.mp3", Vec::new());
        let start = tokio::time::Instant::now();

        let seconds = probe_with_timeout(
            &StalledProbe,
            &file,
            Arc::new(Vec::new()),
            Duration::from_millis(3500),
        )
        .await;

        assert_eq!(seconds, 0.0);
        assert!(start.elapsed() < Duration::from_secs(4));
    }
}
