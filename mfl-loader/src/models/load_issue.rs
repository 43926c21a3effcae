//! Load errors and warnings
//!
//! Non-fatal problems accumulate on the session and are reported alongside
//! the (partial) result set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issue severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueSeverity {
    /// Noted, entry still produced
    Warning,
    /// File excluded from output, load continues
    Skip,
    /// Load cannot continue
    Critical,
}

/// Issue taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    /// File matched no known category
    CategorizationUnknown,
    /// Transient collaborator failure that was retried
    CollaboratorTransientFailure,
    /// Permanent collaborator failure, degraded fields used
    CollaboratorPermanentFailure,
    /// Primary file unreadable (permanent), entry excluded
    ReadFailed,
    /// Transient failures outlasted every attempt, entry excluded
    RetryExhausted,
    /// Same (file name, size) as an earlier entry; collapsed into it
    DuplicateEntry,
    /// Another load session is active
    SessionConflict,
    /// No usable input files
    EmptyBatch,
}

impl IssueKind {
    /// Machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            IssueKind::CategorizationUnknown => "CATEGORIZATION_UNKNOWN",
            IssueKind::CollaboratorTransientFailure => "COLLABORATOR_TRANSIENT_FAILURE",
            IssueKind::CollaboratorPermanentFailure => "COLLABORATOR_PERMANENT_FAILURE",
            IssueKind::ReadFailed => "READ_FAILED",
            IssueKind::RetryExhausted => "RETRY_EXHAUSTED",
            IssueKind::DuplicateEntry => "DUPLICATE_ENTRY",
            IssueKind::SessionConflict => "SESSION_CONFLICT",
            IssueKind::EmptyBatch => "EMPTY_BATCH",
        }
    }
}

/// One recorded error or warning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadIssue {
    /// File that caused the issue
    pub file_name: String,
    /// Issue kind
    pub kind: IssueKind,
    /// Human-readable message
    pub message: String,
    /// Severity
    pub severity: IssueSeverity,
    /// Attempts made before the issue was recorded (0 when not applicable)
    pub attempts: u32,
    /// When the issue occurred
    pub occurred_at: DateTime<Utc>,
}

impl LoadIssue {
    fn new(
        file_name: impl Into<String>,
        kind: IssueKind,
        message: impl Into<String>,
        severity: IssueSeverity,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            kind,
            message: message.into(),
            severity,
            attempts: 0,
            occurred_at: Utc::now(),
        }
    }

    /// Create new warning
    pub fn warning(file_name: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(file_name, kind, message, IssueSeverity::Warning)
    }

    /// Create new skip error
    pub fn skip(file_name: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(file_name, kind, message, IssueSeverity::Skip)
    }

    /// Create new critical error
    pub fn critical(file_name: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(file_name, kind, message, IssueSeverity::Critical)
    }

    /// Record the attempt count
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// True when transient failures exhausted the attempt budget
    pub fn is_exhausted(&self) -> bool {
        self.kind == IssueKind::RetryExhausted
    }
}
