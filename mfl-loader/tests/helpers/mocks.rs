//! Mock collaborators
//!
//! `MockExtractor` can be told to stall, fail transiently a fixed number of
//! times per file, or fail permanently, and records the peak number of calls
//! in flight.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mfl_loader::models::{
    FileHandle, LoadParameters, MemoryFile, MetadataSource, RawFile, TrackMetadata,
};
use mfl_loader::services::{
    DurationProbe, KeyValueAnalysisParser, MetadataExtractor, OverrideStore,
};
use mfl_loader::{Collaborators, EnrichError, LoadObserver, Loader};

/// In-memory file handle
pub fn mem(name: &str, bytes: &[u8]) -> FileHandle {
    MemoryFile::new(name, bytes.to_vec()).into_handle()
}

#[derive(Default)]
pub struct MockExtractor {
    delay: Duration,
    transient_failures: HashMap<String, u32>,
    permanent_failures: HashSet<String>,
    calls: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call takes `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// First `count` calls for `file_name` fail with a network timeout
    pub fn failing_transiently(mut self, file_name: &str, count: u32) -> Self {
        self.transient_failures.insert(file_name.to_string(), count);
        self
    }

    /// Every call for `file_name` fails permanently
    pub fn failing_permanently(mut self, file_name: &str) -> Self {
        self.permanent_failures.insert(file_name.to_string());
        self
    }

    pub fn calls_for(&self, file_name: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(file_name)
            .copied()
            .unwrap_or(0)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataExtractor for MockExtractor {
    async fn extract(
        &self,
        file: &dyn RawFile,
        _bytes: Arc<Vec<u8>>,
    ) -> Result<TrackMetadata, EnrichError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(file.name().to_string()).or_insert(0);
            *count += 1;
            *count
        };

        if self.permanent_failures.contains(file.name()) {
            return Err(EnrichError::Metadata("unsupported tag version".to_string()));
        }
        if let Some(&failures) = self.transient_failures.get(file.name()) {
            if call <= failures {
                return Err(EnrichError::Metadata("network timeout".to_string()));
            }
        }

        let mut metadata = TrackMetadata::from_filename(file.name());
        metadata.title = format!("Tagged {}", metadata.title);
        metadata.source = MetadataSource::Tags;
        Ok(metadata)
    }
}

/// Probe reporting a constant duration
pub struct FixedProbe(pub f64);

#[async_trait]
impl DurationProbe for FixedProbe {
    async fn probe(&self, _file: &dyn RawFile, _bytes: Arc<Vec<u8>>) -> Result<f64, EnrichError> {
        Ok(self.0)
    }
}

/// Primary file whose bytes can never be read
#[derive(Debug)]
pub struct UnreadableFile(pub String);

#[async_trait]
impl RawFile for UnreadableFile {
    fn name(&self) -> &str {
        &self.0
    }

    fn size(&self) -> u64 {
        64
    }

    fn last_modified(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "access denied",
        ))
    }
}

pub fn test_collaborators(extractor: Arc<MockExtractor>) -> Collaborators {
    Collaborators {
        metadata: extractor,
        duration: Arc::new(FixedProbe(180.0)),
        analysis: Arc::new(KeyValueAnalysisParser::new()),
        custom_metadata: Arc::new(OverrideStore::new()),
    }
}

/// Loader with mock collaborators and short retry delays
pub fn test_loader(
    extractor: Arc<MockExtractor>,
    params: LoadParameters,
    observer: Arc<dyn LoadObserver>,
) -> Loader {
    Loader::new(params, test_collaborators(extractor), observer)
}

/// Default parameters with fast retries
pub fn fast_params() -> LoadParameters {
    LoadParameters {
        retry_base_delay_ms: 10,
        retry_max_delay_ms: 100,
        ..Default::default()
    }
}
