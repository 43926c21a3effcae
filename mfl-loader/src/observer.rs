//! Load notification listeners

use mfl_common::events::{EventBus, LoadEvent};
use std::sync::Mutex;

/// Receives load notifications in emission order
///
/// Called from the loader's task; implementations must not block.
pub trait LoadObserver: Send + Sync {
    fn notify(&self, event: LoadEvent);
}

impl LoadObserver for EventBus {
    fn notify(&self, event: LoadEvent) {
        self.emit_lossy(event);
    }
}

/// Discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl LoadObserver for NullObserver {
    fn notify(&self, _event: LoadEvent) {}
}

/// Keeps every notification in memory
///
/// Handy for the CLI summary and for asserting event order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<LoadEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<LoadEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LoadObserver for RecordingObserver {
    fn notify(&self, event: LoadEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
