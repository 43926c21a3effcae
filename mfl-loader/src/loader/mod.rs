//! Load orchestration
//!
//! **Progressive mode** (default):
//! 1. Stubs: classify, build the match index once, materialize one stub per
//!    primary file and publish them before any enrichment starts
//! 2a. Priority: enrich the first `priority_count` entries in sequence
//! 2b. Background: enrich the rest one at a time, yielding between items
//! 3. Post-process (sort + dedup) and publish the final collection
//!
//! **Standard mode**: stubs are built the same way, then entries are enriched
//! chunk by chunk through the `ConcurrencyScheduler`, results applied in
//! index order.
//!
//! Phase 1 runs inside `start`; everything after it runs on a spawned task.
//! Each write is preceded by a session-ownership check, so a session retired
//! by `reset` discards its in-flight results instead of applying them.

pub mod enrichment;
pub mod postprocess;
pub mod session;

use chrono::Utc;
use mfl_common::events::{EntrySummary, LoadEvent, ProgressivePhase};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{EnrichError, LoadError};
use crate::models::{
    Entry, FileHandle, IssueKind, LoadIssue, LoadMode, LoadParameters, LoadSession, LoadState,
};
use crate::observer::LoadObserver;
use crate::services::classifier::{Category, Classifier};
use crate::services::match_index::MatchIndex;
use crate::services::retry::ErrorClass;
use crate::services::scheduler::ConcurrencyScheduler;

pub use enrichment::{default_classifier, Collaborators, EnrichReport, Enricher, Enrichment, ErrorClassifier};
pub use session::{SessionGuard, SessionRegistry, SessionToken};

/// Result of a finished (or superseded) session
#[derive(Debug)]
pub struct LoadOutcome {
    /// Final session state, errors and warnings
    pub session: LoadSession,
    /// Sorted, deduplicated entries (empty when superseded)
    pub entries: Vec<Entry>,
}

impl LoadOutcome {
    pub fn is_superseded(&self) -> bool {
        self.session.state == LoadState::Superseded
    }

    /// Snapshots of the delivered entries
    pub fn summaries(&self) -> Vec<EntrySummary> {
        self.entries.iter().map(Entry::summary).collect()
    }
}

/// Running session
///
/// Phase 1 is complete by the time a handle exists; `stubs` is that result.
#[derive(Debug)]
pub struct LoadHandle {
    session_id: Uuid,
    stubs: Vec<EntrySummary>,
    task: JoinHandle<LoadOutcome>,
}

impl LoadHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Stub entries published before enrichment began
    pub fn stubs(&self) -> &[EntrySummary] {
        &self.stubs
    }

    /// Wait for the background phases to finish
    pub async fn wait(self) -> Result<LoadOutcome, LoadError> {
        self.task
            .await
            .map_err(|e| LoadError::Internal(format!("Load task failed: {}", e)))
    }
}

/// Entry point for loading batches
pub struct Loader {
    params: LoadParameters,
    collaborators: Collaborators,
    observer: Arc<dyn LoadObserver>,
    registry: Arc<SessionRegistry>,
    classify: ErrorClassifier,
}

impl Loader {
    pub fn new(
        params: LoadParameters,
        collaborators: Collaborators,
        observer: Arc<dyn LoadObserver>,
    ) -> Self {
        Self {
            params,
            collaborators,
            observer,
            registry: Arc::new(SessionRegistry::new()),
            classify: default_classifier(),
        }
    }

    /// Replace the transient/permanent classifier
    pub fn with_error_classifier<F>(mut self, classify: F) -> Self
    where
        F: Fn(&EnrichError) -> ErrorClass + Send + Sync + 'static,
    {
        self.classify = Arc::new(classify);
        self
    }

    /// Default parameters for `start`
    pub fn parameters(&self) -> &LoadParameters {
        &self.params
    }

    /// True while a session owns the active slot
    pub fn is_loading(&self) -> bool {
        self.registry.active().is_some()
    }

    /// Active session id, if any
    pub fn active_session(&self) -> Option<Uuid> {
        self.registry.active().map(|t| t.session_id)
    }

    /// Supersede the active session
    ///
    /// Returns the retired session id. Its background work keeps running
    /// until the current collaborator call returns, then discards the result.
    pub fn reset(&self) -> Option<Uuid> {
        self.registry.reset().map(|t| t.session_id)
    }

    /// Load a batch and wait for the result
    pub async fn load(&self, files: Vec<FileHandle>) -> Result<LoadOutcome, LoadError> {
        self.start(files)?.wait().await
    }

    /// Start a session with the loader's default parameters
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, files: Vec<FileHandle>) -> Result<LoadHandle, LoadError> {
        self.start_with(files, self.params.clone())
    }

    /// Start a session with explicit parameters
    ///
    /// Runs phase 1 (classification, matching, stubs) before returning; the
    /// enrichment phases run on a spawned task. Out-of-range parameters are
    /// rejected before the session slot is taken.
    pub fn start_with(
        &self,
        files: Vec<FileHandle>,
        params: LoadParameters,
    ) -> Result<LoadHandle, LoadError> {
        if let Err(e) = params.validate() {
            tracing::warn!(error = %e, "Load rejected");
            self.notify_failed(None, &e);
            return Err(e);
        }

        let guard = match self.registry.begin() {
            Ok(guard) => guard,
            Err(e) => {
                self.notify_failed(None, &e);
                return Err(e);
            }
        };

        let mode = if params.progressive_mode {
            LoadMode::Progressive
        } else {
            LoadMode::Standard
        };
        let token = guard.token();
        let mut session = LoadSession::new(token.session_id, token.generation, mode);
        let session_id = session.session_id;

        tracing::info!(
            session_id = %session_id,
            files = files.len(),
            mode = ?mode,
            "Starting load session"
        );

        // Phase 1: categorize
        session.transition_to(LoadState::Categorizing);
        let total_input = files.len();
        let classifier = Classifier::new(&params.primary_extensions);
        let mut primaries = Vec::new();
        let mut sidecars = Vec::new();

        for file in files {
            match classifier.classify(file.as_ref()) {
                Category::Primary => primaries.push(file),
                category @ (Category::Caption | Category::AnalysisText) => {
                    sidecars.push((category, file))
                }
                Category::Unknown => {
                    tracing::debug!(file = %file.name(), "Unrecognized file excluded");
                    session.add_warning(LoadIssue::warning(
                        file.name(),
                        IssueKind::CategorizationUnknown,
                        "Unrecognized file type, excluded from matching and output",
                    ));
                }
            }
        }

        if primaries.is_empty() {
            session.transition_to(LoadState::Failed);
            let err = LoadError::EmptyBatch { total: total_input };
            tracing::warn!(session_id = %session_id, error = %err, "Load failed");
            self.notify_failed(Some(session_id), &err);
            return Err(err);
        }

        let index = MatchIndex::build(sidecars, params.fuzzy_match_threshold);

        // Phase 1: stubs
        session.transition_to(LoadState::StubBuild);
        session.total_files = primaries.len();

        let entries: Vec<Entry> = primaries
            .into_iter()
            .map(|primary| {
                let matched = index.resolve_file(primary.name());
                Entry::stub(primary, matched.caption, matched.analysis)
            })
            .collect();
        let stubs: Vec<EntrySummary> = entries.iter().map(Entry::summary).collect();

        tracing::info!(
            session_id = %session_id,
            entries = entries.len(),
            sidecars = index.len(),
            fuzzy_comparisons = index.fuzzy_comparisons(),
            "Phase 1: STUBS ready"
        );

        self.observer.notify(LoadEvent::LoadStarted {
            session_id,
            total_files: entries.len(),
            timestamp: Utc::now(),
        });

        if mode == LoadMode::Progressive {
            self.observer.notify(LoadEvent::ProgressiveUpdate {
                session_id,
                phase: ProgressivePhase::Stubs,
                entries: stubs.clone(),
                enriched: 0,
                total: entries.len(),
                timestamp: Utc::now(),
            });
        }

        let enricher = Enricher::new(
            self.collaborators.clone(),
            params.retry_policy(),
            params.probe_timeout(),
            Arc::clone(&self.classify),
        );

        let run = LoadRun {
            guard,
            session,
            slots: entries.into_iter().map(Some).collect(),
            enricher,
            observer: Arc::clone(&self.observer),
            params,
        };
        let task = tokio::spawn(run.execute());

        Ok(LoadHandle {
            session_id,
            stubs,
            task,
        })
    }

    fn notify_failed(&self, session_id: Option<Uuid>, err: &LoadError) {
        self.observer.notify(LoadEvent::LoadFailed {
            session_id,
            error_code: err.code().to_string(),
            error_message: err.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// State owned by the background task of one session
struct LoadRun {
    guard: SessionGuard,
    session: LoadSession,
    /// `None` once an entry failed terminally
    slots: Vec<Option<Entry>>,
    enricher: Enricher,
    observer: Arc<dyn LoadObserver>,
    params: LoadParameters,
}

impl LoadRun {
    async fn execute(mut self) -> LoadOutcome {
        let finished = match self.session.mode {
            LoadMode::Progressive => self.run_progressive().await,
            LoadMode::Standard => self.run_standard().await,
        };

        if finished && self.guard.is_current() {
            self.complete()
        } else {
            self.supersede()
        }
    }

    /// Phases 2a and 2b; false if the session was superseded
    async fn run_progressive(&mut self) -> bool {
        let total = self.slots.len();
        let priority = self.params.priority_count.min(total);

        self.session.transition_to(LoadState::PriorityEnrichment);
        tracing::info!(
            session_id = %self.session.session_id,
            priority,
            "Phase 2a: PRIORITY ENRICHMENT"
        );

        for index in 0..priority {
            if !self.enrich_one(index).await {
                return false;
            }
        }

        self.observer.notify(LoadEvent::ProgressiveUpdate {
            session_id: self.session.session_id,
            phase: ProgressivePhase::Priority,
            entries: self.snapshot(),
            enriched: self.enriched_count(),
            total,
            timestamp: Utc::now(),
        });

        self.session.transition_to(LoadState::BackgroundEnrichment);
        tracing::info!(
            session_id = %self.session.session_id,
            remaining = total - priority,
            "Phase 2b: BACKGROUND ENRICHMENT"
        );

        for index in priority..total {
            tokio::task::yield_now().await;
            if !self.enrich_one(index).await {
                return false;
            }
        }

        true
    }

    /// Enrich one slot in place; false if the result had to be discarded
    async fn enrich_one(&mut self, index: usize) -> bool {
        let Some(entry) = self.slots[index].as_ref() else {
            return true;
        };
        let primary = Arc::clone(&entry.primary);
        let analysis = entry.analysis.clone();

        let report = self.enricher.enrich(primary, analysis).await;

        if !self.guard.is_current() {
            tracing::info!(
                session_id = %self.session.session_id,
                file = %report.file_name,
                "Session superseded, discarding result"
            );
            return false;
        }

        self.apply(index, report);
        true
    }

    /// Standard mode; false if the session was superseded
    async fn run_standard(&mut self) -> bool {
        let total = self.slots.len();
        let chunk_size = self.params.effective_chunk_size();
        let total_chunks = (total + chunk_size - 1) / chunk_size;
        let scheduler = ConcurrencyScheduler::new(self.params.effective_max_concurrent());

        self.session.transition_to(LoadState::BatchEnrichment);
        tracing::info!(
            session_id = %self.session.session_id,
            total_chunks,
            max_concurrent = scheduler.max_concurrent(),
            "Phase 2: BATCH ENRICHMENT"
        );

        for chunk_index in 0..total_chunks {
            let start = chunk_index * chunk_size;
            let end = (start + chunk_size).min(total);

            let items: Vec<(usize, FileHandle, Option<FileHandle>)> = (start..end)
                .filter_map(|i| {
                    self.slots[i]
                        .as_ref()
                        .map(|e| (i, Arc::clone(&e.primary), e.analysis.clone()))
                })
                .collect();

            let enricher = &self.enricher;
            let reports = scheduler
                .run_all(items, |_, (index, primary, analysis)| async move {
                    Ok::<_, Infallible>((index, enricher.enrich(primary, analysis).await))
                })
                .await;

            if !self.guard.is_current() {
                tracing::info!(
                    session_id = %self.session.session_id,
                    chunk_index,
                    "Session superseded, discarding chunk results"
                );
                return false;
            }

            for (index, report) in reports.into_iter().flatten() {
                self.apply(index, report);
            }

            self.observer.notify(LoadEvent::ChunkComplete {
                session_id: self.session.session_id,
                chunk_index,
                total_chunks,
                timestamp: Utc::now(),
            });
        }

        true
    }

    /// Write one report into the session; caller checked ownership
    fn apply(&mut self, index: usize, report: EnrichReport) {
        let session_id = self.session.session_id;

        for warning in report.warnings {
            self.session.add_warning(warning);
        }

        match report.result {
            Ok(enrichment) => {
                if let Some(entry) = self.slots[index].as_mut() {
                    entry.apply_enrichment(
                        enrichment.metadata,
                        enrichment.duration,
                        enrichment.analysis,
                    );
                    self.observer.notify(LoadEvent::FileProcessed {
                        session_id,
                        entry: entry.summary(),
                        timestamp: Utc::now(),
                    });
                }
            }
            Err(issue) => {
                self.slots[index] = None;
                self.session.add_error(issue);
            }
        }

        let current = self.session.record_processed();
        self.observer.notify(LoadEvent::LoadProgress {
            session_id,
            current,
            total: self.session.total_files,
            file_name: report.file_name,
            percentage: self.session.percentage(),
            timestamp: Utc::now(),
        });
    }

    fn snapshot(&self) -> Vec<EntrySummary> {
        self.slots.iter().flatten().map(Entry::summary).collect()
    }

    fn enriched_count(&self) -> usize {
        self.slots.iter().flatten().filter(|e| e.enriched).count()
    }

    fn complete(self) -> LoadOutcome {
        let LoadRun {
            guard,
            mut session,
            slots,
            observer,
            ..
        } = self;
        let session_id = session.session_id;

        let finalized = postprocess::finalize(slots.into_iter().flatten().collect());
        for duplicate in &finalized.duplicates {
            session.add_warning(LoadIssue::warning(
                duplicate.file_name.as_str(),
                IssueKind::DuplicateEntry,
                format!(
                    "Duplicate of an earlier entry ({} bytes), collapsed",
                    duplicate.file_size
                ),
            ));
        }
        drop(finalized.duplicates);
        let entries = finalized.entries;

        session.transition_to(LoadState::Completed);
        // Free the slot before announcing completion so listeners can start
        // the next load straight away
        drop(guard);

        let summaries: Vec<EntrySummary> = entries.iter().map(Entry::summary).collect();

        if session.mode == LoadMode::Progressive {
            observer.notify(LoadEvent::ProgressiveUpdate {
                session_id,
                phase: ProgressivePhase::Complete,
                entries: summaries.clone(),
                enriched: entries.iter().filter(|e| e.enriched).count(),
                total: entries.len(),
                timestamp: Utc::now(),
            });
        }

        tracing::info!(
            session_id = %session_id,
            entries = entries.len(),
            errors = session.errors.len(),
            warnings = session.warnings.len(),
            duration_ms = session.duration_ms(),
            "Load session completed"
        );

        observer.notify(LoadEvent::LoadCompleted {
            session_id,
            entries: summaries,
            error_count: session.errors.len(),
            warning_count: session.warnings.len(),
            duration_ms: session.duration_ms(),
            timestamp: Utc::now(),
        });

        LoadOutcome { session, entries }
    }

    fn supersede(mut self) -> LoadOutcome {
        self.session.transition_to(LoadState::Superseded);
        tracing::info!(
            session_id = %self.session.session_id,
            processed = self.session.processed_count,
            "Load session superseded"
        );

        LoadOutcome {
            session: self.session,
            entries: Vec::new(),
        }
    }
}
