//! Single-active session registry
//!
//! At most one load session is active per registry. Starting a second one
//! fails fast with `SessionConflict`; nothing is queued or merged.
//!
//! Every session receives a `SessionToken`. Background work captures the
//! token when it is submitted and checks `is_current` before writing a
//! result, so a session retired by `reset` (or replaced by a newer one) can
//! never mutate entries it no longer owns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::LoadError;

/// Ownership token for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken {
    pub session_id: Uuid,
    pub generation: u64,
}

/// Tracks the active session
#[derive(Debug, Default)]
pub struct SessionRegistry {
    active: Mutex<Option<SessionToken>>,
    generation: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<SessionToken>> {
        // The slot holds a Copy value; a poisoned lock still has a valid one
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim the active slot for a new session
    pub fn begin(self: &Arc<Self>) -> Result<SessionGuard, LoadError> {
        let mut slot = self.slot();

        if let Some(active) = *slot {
            tracing::warn!(
                active_session = %active.session_id,
                "Load rejected: another session is active"
            );
            return Err(LoadError::SessionConflict {
                active: active.session_id,
            });
        }

        let token = SessionToken {
            session_id: Uuid::new_v4(),
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
        };
        *slot = Some(token);

        tracing::debug!(
            session_id = %token.session_id,
            generation = token.generation,
            "Session slot claimed"
        );

        Ok(SessionGuard {
            registry: Arc::clone(self),
            token,
        })
    }

    /// True while `token` still owns the active slot
    pub fn is_current(&self, token: &SessionToken) -> bool {
        *self.slot() == Some(*token)
    }

    /// Active session, if any
    pub fn active(&self) -> Option<SessionToken> {
        *self.slot()
    }

    /// Retire the active session
    ///
    /// Frees the slot and advances the generation. The retired session's
    /// in-flight work sees `is_current == false` from now on.
    pub fn reset(&self) -> Option<SessionToken> {
        let retired = self.slot().take();
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(token) = retired {
            tracing::info!(session_id = %token.session_id, "Session superseded by reset");
        }
        retired
    }

    /// Current generation counter
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn release(&self, token: &SessionToken) {
        let mut slot = self.slot();
        if *slot == Some(*token) {
            *slot = None;
            tracing::debug!(session_id = %token.session_id, "Session slot released");
        }
    }
}

/// Holds the active slot until dropped
///
/// Dropping releases the slot only if this session still owns it.
#[derive(Debug)]
pub struct SessionGuard {
    registry: Arc<SessionRegistry>,
    token: SessionToken,
}

impl SessionGuard {
    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn session_id(&self) -> Uuid {
        self.token.session_id
    }

    /// True while this session has not been superseded
    pub fn is_current(&self) -> bool {
        self.registry.is_current(&self.token)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.release(&self.token);
    }
}
