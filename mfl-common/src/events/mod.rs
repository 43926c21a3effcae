//! Event types for the MFL event system
//!
//! Provides the load event definitions and the EventBus used to fan them out.

mod load_types;

pub use load_types::{EntrySummary, ProgressivePhase};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Load pipeline events
///
/// Closed set of named notifications. Each variant is an immutable snapshot;
/// consumers never receive diffs. Serialized with a `type` tag for SSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LoadEvent {
    /// Load session started
    ///
    /// Triggers:
    /// - SSE: Show loading indicator
    LoadStarted {
        /// Load session UUID
        session_id: Uuid,
        /// Number of primary files that will produce entries
        total_files: usize,
        /// When session started
        timestamp: DateTime<Utc>,
    },

    /// Per-file progress update
    LoadProgress {
        /// Load session UUID
        session_id: Uuid,
        /// Files processed so far
        current: usize,
        /// Total files in the session
        total: usize,
        /// File just processed
        file_name: String,
        /// Progress percentage (0.0-100.0)
        percentage: f32,
        /// When progress updated
        timestamp: DateTime<Utc>,
    },

    /// One entry finished enrichment
    FileProcessed {
        /// Load session UUID
        session_id: Uuid,
        /// Snapshot of the enriched entry
        entry: EntrySummary,
        /// When the entry finished
        timestamp: DateTime<Utc>,
    },

    /// Standard mode chunk finished
    ChunkComplete {
        /// Load session UUID
        session_id: Uuid,
        /// Zero-based chunk index
        chunk_index: usize,
        /// Number of chunks in the session
        total_chunks: usize,
        /// When the chunk finished
        timestamp: DateTime<Utc>,
    },

    /// Progressive mode phase snapshot
    ///
    /// Phase 1 is always emitted before any phase 2 notification.
    ProgressiveUpdate {
        /// Load session UUID
        session_id: Uuid,
        /// Delivery phase
        phase: ProgressivePhase,
        /// Full entry collection as of this phase
        entries: Vec<EntrySummary>,
        /// Entries enriched so far
        enriched: usize,
        /// Total entries
        total: usize,
        /// When the phase was reached
        timestamp: DateTime<Utc>,
    },

    /// Load session completed
    ///
    /// Triggers:
    /// - SSE: Replace the library view with the final collection
    LoadCompleted {
        /// Load session UUID
        session_id: Uuid,
        /// Final, sorted, deduplicated entries
        entries: Vec<EntrySummary>,
        /// Files that failed terminally
        error_count: usize,
        /// Non-fatal warnings (unknown files, degraded collaborators)
        warning_count: usize,
        /// Session duration in milliseconds
        duration_ms: u64,
        /// When session completed
        timestamp: DateTime<Utc>,
    },

    /// Load rejected or failed as a whole
    LoadFailed {
        /// Load session UUID (None when rejected before a session existed)
        session_id: Option<Uuid>,
        /// Machine-readable code (e.g. "SESSION_CONFLICT", "EMPTY_BATCH")
        error_code: String,
        /// Error message details
        error_message: String,
        /// When the failure occurred
        timestamp: DateTime<Utc>,
    },
}

impl LoadEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            LoadEvent::LoadStarted { .. } => "LoadStarted",
            LoadEvent::LoadProgress { .. } => "LoadProgress",
            LoadEvent::FileProcessed { .. } => "FileProcessed",
            LoadEvent::ChunkComplete { .. } => "ChunkComplete",
            LoadEvent::ProgressiveUpdate { .. } => "ProgressiveUpdate",
            LoadEvent::LoadCompleted { .. } => "LoadCompleted",
            LoadEvent::LoadFailed { .. } => "LoadFailed",
        }
    }

    /// Session the event belongs to, if any
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            LoadEvent::LoadStarted { session_id, .. }
            | LoadEvent::LoadProgress { session_id, .. }
            | LoadEvent::FileProcessed { session_id, .. }
            | LoadEvent::ChunkComplete { session_id, .. }
            | LoadEvent::ProgressiveUpdate { session_id, .. }
            | LoadEvent::LoadCompleted { session_id, .. } => Some(*session_id),
            LoadEvent::LoadFailed { session_id, .. } => *session_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the loader)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use mfl_common::events::{EventBus, LoadEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(LoadEvent::LoadStarted {
///     session_id: uuid::Uuid::new_v4(),
///     total_files: 3,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "LoadStarted");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LoadEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before slow subscribers lag
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: LoadEvent,
    ) -> Result<usize, broadcast::error::SendError<LoadEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: LoadEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
