//! Load session state machine
//!
//! Progressive mode: CREATED → CATEGORIZING → STUB_BUILD → PRIORITY_ENRICHMENT
//! → BACKGROUND_ENRICHMENT → COMPLETED.
//! Standard mode replaces the two enrichment states with BATCH_ENRICHMENT.
//! FAILED is reached only when the whole batch is unusable; SUPERSEDED when a
//! reset retired the session while it was still running.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::LoadIssue;

/// Load workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadState {
    /// Session allocated, nothing done yet
    Created,
    /// Classifying input files and building the match index
    Categorizing,
    /// Materializing stub entries
    StubBuild,
    /// Sequentially enriching the priority subset
    PriorityEnrichment,
    /// Enriching the remainder one at a time with yields
    BackgroundEnrichment,
    /// Standard mode bounded-concurrency enrichment
    BatchEnrichment,
    /// Finished; entries delivered
    Completed,
    /// Whole batch unusable
    Failed,
    /// Retired by a reset before finishing
    Superseded,
}

/// Delivery mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    Progressive,
    Standard,
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: LoadState,
    pub new_state: LoadState,
    pub transitioned_at: DateTime<Utc>,
}

/// Load session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSession {
    /// Unique session identifier
    pub session_id: Uuid,
    /// Registry generation the session was issued under
    pub generation: u64,
    /// Current workflow state
    pub state: LoadState,
    /// Delivery mode
    pub mode: LoadMode,
    /// Primary files in this session
    pub total_files: usize,
    /// Primary files that reached a terminal outcome
    pub processed_count: usize,
    /// Terminal per-file failures
    pub errors: Vec<LoadIssue>,
    /// Non-fatal issues
    pub warnings: Vec<LoadIssue>,
    /// True until the session reaches a terminal state
    pub is_loading: bool,
    /// Session start time
    pub started_at: DateTime<Utc>,
    /// Session end time (if terminal)
    pub ended_at: Option<DateTime<Utc>>,
}

impl LoadSession {
    /// Create new session
    pub fn new(session_id: Uuid, generation: u64, mode: LoadMode) -> Self {
        Self {
            session_id,
            generation,
            state: LoadState::Created,
            mode,
            total_files: 0,
            processed_count: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            is_loading: true,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: LoadState) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if self.is_terminal() {
            self.is_loading = false;
            self.ended_at = Some(Utc::now());
        }

        tracing::debug!(
            session_id = %self.session_id,
            old_state = ?transition.old_state,
            new_state = ?new_state,
            "Load session state transition"
        );

        transition
    }

    /// Count one primary file as finished (success or failure)
    pub fn record_processed(&mut self) -> usize {
        self.processed_count += 1;
        self.processed_count
    }

    /// Progress percentage (0.0 - 100.0)
    pub fn percentage(&self) -> f32 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.processed_count as f32 / self.total_files as f32) * 100.0
        }
    }

    /// Add terminal error
    pub fn add_error(&mut self, error: LoadIssue) {
        self.errors.push(error);
    }

    /// Add non-fatal warning
    pub fn add_warning(&mut self, warning: LoadIssue) {
        self.warnings.push(warning);
    }

    /// Elapsed milliseconds (up to end time when terminal)
    pub fn duration_ms(&self) -> u64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as u64
    }

    /// Check if session is terminal (finished)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            LoadState::Completed | LoadState::Failed | LoadState::Superseded
        )
    }
}
