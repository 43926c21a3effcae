//! Per-entry enrichment
//!
//! One attempt:
//! 1. Read the primary file's bytes (failure here fails the attempt)
//! 2. Extract metadata; a permanent failure degrades to filename-derived
//!    metadata, a transient one fails the attempt so it is retried
//! 3. Probe duration under a timeout (0.0 on timeout or failure)
//! 4. Read and parse the analysis sidecar, if one was matched
//! 5. Apply custom metadata overrides
//!
//! Attempts are wrapped by `with_retry`. Every attempt starts from scratch:
//! bytes are re-read and nothing from a failed attempt is reused.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{default_error_class, EnrichError};
use crate::models::{FileHandle, IssueKind, LoadIssue, MetadataOverrides, TrackMetadata};
use crate::services::analysis_parser::{AnalysisTextParser, KeyValueAnalysisParser, StructuredAnalysis};
use crate::services::custom_metadata::{CustomMetadataStore, OverrideStore};
use crate::services::duration_probe::{probe_with_timeout, DurationProbe, LoftyDurationProbe};
use crate::services::metadata_extractor::{LoftyMetadataExtractor, MetadataExtractor};
use crate::services::retry::{with_retry, ErrorClass, RetryError, RetryPolicy};

/// Transient/permanent decision for collaborator errors
pub type ErrorClassifier = Arc<dyn Fn(&EnrichError) -> ErrorClass + Send + Sync>;

/// External collaborators consulted during enrichment
#[derive(Clone)]
pub struct Collaborators {
    pub metadata: Arc<dyn MetadataExtractor>,
    pub duration: Arc<dyn DurationProbe>,
    pub analysis: Arc<dyn AnalysisTextParser>,
    pub custom_metadata: Arc<dyn CustomMetadataStore>,
}

impl Collaborators {
    /// lofty extraction and probing, key/value analysis parsing, no overrides
    pub fn lofty() -> Self {
        Self {
            metadata: Arc::new(LoftyMetadataExtractor::new()),
            duration: Arc::new(LoftyDurationProbe::new()),
            analysis: Arc::new(KeyValueAnalysisParser::new()),
            custom_metadata: Arc::new(OverrideStore::new()),
        }
    }

    /// Replace the override store
    pub fn with_custom_metadata(mut self, store: Arc<dyn CustomMetadataStore>) -> Self {
        self.custom_metadata = store;
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::lofty()
    }
}

/// Fields produced by one successful attempt
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub metadata: TrackMetadata,
    pub duration: f64,
    pub analysis: Option<StructuredAnalysis>,
}

/// Terminal result of enriching one entry
#[derive(Debug)]
pub struct EnrichReport {
    pub file_name: String,
    /// Enrichment, or the error that excludes the entry
    pub result: Result<Enrichment, LoadIssue>,
    /// Non-fatal issues (retried transient failures, degraded collaborators)
    pub warnings: Vec<LoadIssue>,
    pub attempts: u32,
}

/// Attempt output: enrichment plus the degradations it absorbed
struct AttemptOutput {
    enrichment: Enrichment,
    warnings: Vec<LoadIssue>,
}

/// Runs enrichment attempts under the retry policy
#[derive(Clone)]
pub struct Enricher {
    collaborators: Collaborators,
    policy: RetryPolicy,
    probe_timeout: Duration,
    classify: ErrorClassifier,
}

impl Enricher {
    pub fn new(
        collaborators: Collaborators,
        policy: RetryPolicy,
        probe_timeout: Duration,
        classify: ErrorClassifier,
    ) -> Self {
        Self {
            collaborators,
            policy,
            probe_timeout,
            classify,
        }
    }

    /// Enrich one primary file; never fails past this boundary
    pub async fn enrich(&self, primary: FileHandle, analysis: Option<FileHandle>) -> EnrichReport {
        let file_name = primary.name().to_string();

        let outcome = with_retry(
            &file_name,
            &self.policy,
            |e: &EnrichError| (self.classify)(e),
            |_attempt| self.attempt(&primary, analysis.as_ref()),
        )
        .await;

        match outcome {
            Ok(retried) => {
                let mut warnings = transient_warnings(&file_name, &retried.transient_errors);
                warnings.extend(retried.value.warnings);

                tracing::debug!(
                    file = %file_name,
                    attempts = retried.attempts,
                    warnings = warnings.len(),
                    "Entry enriched"
                );

                EnrichReport {
                    file_name,
                    result: Ok(retried.value.enrichment),
                    warnings,
                    attempts: retried.attempts,
                }
            }
            Err(err) => {
                let warnings = transient_warnings(&file_name, err.transient_errors());
                let issue = terminal_issue(&file_name, &err);

                tracing::warn!(
                    file = %file_name,
                    attempts = err.attempts(),
                    kind = issue.kind.code(),
                    error = %err,
                    "Entry excluded"
                );

                EnrichReport {
                    file_name,
                    attempts: err.attempts(),
                    result: Err(issue),
                    warnings,
                }
            }
        }
    }

    fn is_transient(&self, error: &EnrichError) -> bool {
        (self.classify)(error) == ErrorClass::Transient
    }

    async fn attempt(
        &self,
        primary: &FileHandle,
        analysis: Option<&FileHandle>,
    ) -> Result<AttemptOutput, EnrichError> {
        let file_name = primary.name();
        let mut warnings = Vec::new();

        let bytes = primary
            .read_bytes()
            .await
            .map_err(|e| EnrichError::read(file_name, e))?;
        let bytes = Arc::new(bytes);

        let mut metadata = match self
            .collaborators
            .metadata
            .extract(primary.as_ref(), Arc::clone(&bytes))
            .await
        {
            Ok(metadata) => metadata,
            Err(e) if self.is_transient(&e) => return Err(e),
            Err(e) => {
                tracing::debug!(file = %file_name, error = %e, "Using filename metadata");
                warnings.push(LoadIssue::warning(
                    file_name,
                    IssueKind::CollaboratorPermanentFailure,
                    format!("{}; using filename metadata", e),
                ));
                TrackMetadata::from_filename(file_name)
            }
        };

        let duration = probe_with_timeout(
            self.collaborators.duration.as_ref(),
            primary.as_ref(),
            bytes,
            self.probe_timeout,
        )
        .await;

        let analysis = match analysis {
            Some(sidecar) => match sidecar.read_text().await {
                Ok(text) => self.collaborators.analysis.parse(&text),
                Err(e) => {
                    let e = EnrichError::analysis(sidecar.name(), e);
                    if self.is_transient(&e) {
                        return Err(e);
                    }
                    warnings.push(LoadIssue::warning(
                        file_name,
                        IssueKind::CollaboratorPermanentFailure,
                        e.to_string(),
                    ));
                    None
                }
            },
            None => None,
        };

        if let Some(overrides) = self
            .collaborators
            .custom_metadata
            .lookup(file_name, primary.size())
        {
            apply_overrides(file_name, &mut metadata, &overrides);
        }

        Ok(AttemptOutput {
            enrichment: Enrichment {
                metadata,
                duration,
                analysis,
            },
            warnings,
        })
    }
}

fn apply_overrides(file_name: &str, metadata: &mut TrackMetadata, overrides: &MetadataOverrides) {
    tracing::debug!(file = %file_name, "Applying custom metadata overrides");
    metadata.apply_overrides(overrides);
}

fn transient_warnings(file_name: &str, messages: &[String]) -> Vec<LoadIssue> {
    messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            LoadIssue::warning(
                file_name,
                IssueKind::CollaboratorTransientFailure,
                message.clone(),
            )
            .with_attempts(i as u32 + 1)
        })
        .collect()
}

fn terminal_issue(file_name: &str, err: &RetryError<EnrichError>) -> LoadIssue {
    let kind = if err.is_exhausted() {
        IssueKind::RetryExhausted
    } else if matches!(err.error(), EnrichError::Read { .. }) {
        IssueKind::ReadFailed
    } else {
        IssueKind::CollaboratorPermanentFailure
    };

    LoadIssue::skip(file_name, kind, err.error().to_string()).with_attempts(err.attempts())
}

/// Classifier used when the loader is not given one
pub fn default_classifier() -> ErrorClassifier {
    Arc::new(default_error_class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemoryFile, MetadataSource, RawFile};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with `error` for the first `failures` calls
    struct FlakyExtractor {
        failures: u32,
        error: &'static str,
        calls: AtomicU32,
    }

    #[async_trait]
    impl MetadataExtractor for FlakyExtractor {
        async fn extract(
            &self,
            file: &dyn RawFile,
            _bytes: Arc<Vec<u8>>,
        ) -> Result<TrackMetadata, EnrichError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(EnrichError::Metadata(self.error.to_string()));
            }
            let mut metadata = TrackMetadata::from_filename(file.name());
            metadata.title = "Tagged".to_string();
            metadata.source = MetadataSource::Tags;
            Ok(metadata)
        }
    }

    struct FixedProbe(f64);

    #[async_trait]
    impl DurationProbe for FixedProbe {
        async fn probe(&self, _file: &dyn RawFile, _bytes: Arc<Vec<u8>>) -> Result<f64, EnrichError> {
            Ok(self.0)
        }
    }

    #[derive(Debug)]
    struct UnreadableFile;

    #[async_trait]
    impl RawFile for UnreadableFile {
        fn name(&self) -> &str {
            "gone.mp3"
        }
        fn size(&self) -> u64 {
            10
        }
        fn last_modified(&self) -> chrono::DateTime<chrono::Utc> {
            chrono::Utc::now()
        }
        async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "deleted"))
        }
    }

    fn enricher(extractor: FlakyExtractor, attempts: u32) -> Enricher {
        enricher_with_store(extractor, attempts, OverrideStore::new())
    }

    fn enricher_with_store(extractor: FlakyExtractor, attempts: u32, store: OverrideStore) -> Enricher {
        let collaborators = Collaborators {
            metadata: Arc::new(extractor),
            duration: Arc::new(FixedProbe(200.0)),
            analysis: Arc::new(KeyValueAnalysisParser::new()),
            custom_metadata: Arc::new(store),
        };
        let policy = RetryPolicy::new(attempts, Duration::from_millis(100), Duration::from_secs(1))
            .without_jitter();
        Enricher::new(collaborators, policy, Duration::from_secs(3), default_classifier())
    }

    fn flaky(failures: u32, error: &'static str) -> FlakyExtractor {
        FlakyExtractor {
            failures,
            error,
            calls: AtomicU32::new(0),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrich_with_analysis_sidecar() {
        let primary = MemoryFile::new("song.mp3", vec![1u8; 16]).into_handle();
        let analysis = MemoryFile::new("song.txt", b"BPM: 120\nKey: D".to_vec()).into_handle();

        let report = enricher(flaky(0, ""), 2).enrich(primary, Some(analysis)).await;
        let enrichment = report.result.unwrap();

        assert_eq!(enrichment.metadata.title, "Tagged");
        assert_eq!(enrichment.duration, 200.0);
        assert_eq!(enrichment.analysis.unwrap().get("bpm"), Some("120"));
        assert!(report.warnings.is_empty());
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retried_then_succeeds() {
        let primary = MemoryFile::new("song.mp3", vec![1u8; 16]).into_handle();

        let report = enricher(flaky(1, "network timeout"), 3).enrich(primary, None).await;

        assert!(report.result.is_ok());
        assert_eq!(report.attempts, 2);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, IssueKind::CollaboratorTransientFailure);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_exhaust_attempts() {
        let primary = MemoryFile::new("song.mp3", vec![1u8; 16]).into_handle();

        let report = enricher(flaky(5, "connection reset by peer"), 2)
            .enrich(primary, None)
            .await;

        let issue = report.result.unwrap_err();
        assert_eq!(issue.kind, IssueKind::RetryExhausted);
        assert_eq!(issue.attempts, 2);
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_metadata_failure_degrades() {
        let primary = MemoryFile::new("Band - Tune.mp3", vec![1u8; 16]).into_handle();

        let report = enricher(flaky(5, "unsupported tag layout"), 3)
            .enrich(primary, None)
            .await;

        let enrichment = report.result.unwrap();
        assert_eq!(enrichment.metadata.title, "Tune");
        assert_eq!(enrichment.metadata.source, MetadataSource::Filename);
        assert_eq!(enrichment.duration, 200.0);
        assert_eq!(report.attempts, 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, IssueKind::CollaboratorPermanentFailure);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_primary_excluded() {
        let primary: FileHandle = Arc::new(UnreadableFile);

        let report = enricher(flaky(0, ""), 3).enrich(primary, None).await;

        let issue = report.result.unwrap_err();
        assert_eq!(issue.kind, IssueKind::ReadFailed);
        assert_eq!(issue.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_analysis_sidecar_degrades() {
        let primary = MemoryFile::new("song.mp3", vec![1u8; 16]).into_handle();
        let sidecar: FileHandle = Arc::new(UnreadableFile);

        let report = enricher(flaky(0, ""), 3).enrich(primary, Some(sidecar)).await;

        let enrichment = report.result.unwrap();
        assert!(enrichment.analysis.is_none());
        assert_eq!(enrichment.metadata.title, "Tagged");
        assert_eq!(report.attempts, 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, IssueKind::CollaboratorPermanentFailure);
        assert!(report.warnings[0].message.contains("analysis sidecar"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrides_applied_last() {
        let mut store = OverrideStore::new();
        store.insert(
            "song.mp3",
            16,
            MetadataOverrides {
                title: Some("Corrected".to_string()),
                ..Default::default()
            },
        );
        let primary = MemoryFile::new("song.mp3", vec![1u8; 16]).into_handle();

        let report = enricher_with_store(flaky(0, ""), 2, store)
            .enrich(primary, None)
            .await;

        assert_eq!(report.result.unwrap().metadata.title, "Corrected");
    }
}
