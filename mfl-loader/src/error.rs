//! Error types for mfl-loader
//!
//! Three layers:
//! - `EnrichError`: collaborator-level failures, classified transient or
//!   permanent and handled at the per-entry enrichment boundary
//! - `LoadError`: session-level fatal conditions that abort a whole load
//! - `ApiError`: HTTP mapping for the service surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::services::file_scanner::ScanError;
use crate::services::retry::ErrorClass;

/// Collaborator failure during enrichment of one entry
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Reading a file's bytes failed
    #[error("Failed to read {file}: {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// Metadata extractor failed
    #[error("Metadata extraction failed: {0}")]
    Metadata(String),

    /// Reading the analysis sidecar failed
    #[error("Failed to read analysis sidecar {file}: {source}")]
    Analysis {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// Duration probe failed
    #[error("Duration probe failed: {0}")]
    Probe(String),

    /// Collaborator call exceeded its time limit
    ///
    /// Also available to collaborators that enforce their own deadlines.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

impl EnrichError {
    /// Wrap an I/O error for `file`
    pub fn read(file: impl Into<String>, source: std::io::Error) -> Self {
        EnrichError::Read {
            file: file.into(),
            source,
        }
    }

    /// Wrap an I/O error for the analysis sidecar `file`
    pub fn analysis(file: impl Into<String>, source: std::io::Error) -> Self {
        EnrichError::Analysis {
            file: file.into(),
            source,
        }
    }
}

/// Message fragments identifying network/timeout-class failures
const TRANSIENT_SIGNATURES: &[&str] = &[
    "timeout",
    "timed out",
    "network",
    "connection reset",
    "connection refused",
    "connection aborted",
    "temporarily unavailable",
    "try again",
    "econnreset",
    "etimedout",
];

/// Default transient/permanent classification
///
/// Timeouts and the I/O kinds that indicate an interrupted or dropped
/// transfer are transient, as is any message carrying a network/timeout
/// signature. Everything else is permanent.
pub fn default_error_class(error: &EnrichError) -> ErrorClass {
    use std::io::ErrorKind;

    match error {
        EnrichError::Timeout { .. } => ErrorClass::Transient,
        EnrichError::Read { source, .. } | EnrichError::Analysis { source, .. } => {
            match source.kind() {
                ErrorKind::TimedOut
                | ErrorKind::Interrupted
                | ErrorKind::WouldBlock
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::NotConnected
                | ErrorKind::BrokenPipe => ErrorClass::Transient,
                _ => classify_message(&source.to_string()),
            }
        }
        EnrichError::Metadata(msg) | EnrichError::Probe(msg) => classify_message(msg),
    }
}

fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if TRANSIENT_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
        ErrorClass::Transient
    } else {
        ErrorClass::Permanent
    }
}

/// Session-level fatal error
#[derive(Debug, Error)]
pub enum LoadError {
    /// Another session is active; the request is rejected, not queued
    #[error("A load session is already active: {active}")]
    SessionConflict { active: Uuid },

    /// No primary files in the batch
    #[error("No usable input files ({total} supplied, none classified as primary)")]
    EmptyBatch { total: usize },

    /// Per-load parameters out of range
    #[error("Invalid load parameters: {0}")]
    InvalidParameters(String),

    /// Directory input could not be scanned
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    /// Background task failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LoadError {
    /// Machine-readable code used in `LoadFailed` events
    pub fn code(&self) -> &'static str {
        match self {
            LoadError::SessionConflict { .. } => "SESSION_CONFLICT",
            LoadError::EmptyBatch { .. } => "EMPTY_BATCH",
            LoadError::InvalidParameters(_) => "INVALID_PARAMETERS",
            LoadError::Scan(_) => "SCAN_FAILED",
            LoadError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - a load is already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Load rejected or failed
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// mfl-common error
    #[error("Common error: {0}")]
    Common(#[from] mfl_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Load(ref err) => {
                let status = match err {
                    LoadError::SessionConflict { .. } => StatusCode::CONFLICT,
                    LoadError::EmptyBatch { .. }
                    | LoadError::InvalidParameters(_)
                    | LoadError::Scan(_) => StatusCode::BAD_REQUEST,
                    LoadError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.code(), err.to_string())
            }
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_kinds_classified() {
        let transient = EnrichError::read("a.mp3", io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert_eq!(default_error_class(&transient), ErrorClass::Transient);

        let permanent = EnrichError::read("a.mp3", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(default_error_class(&permanent), ErrorClass::Permanent);

        let sidecar = EnrichError::analysis(
            "a.txt",
            io::Error::new(io::ErrorKind::ConnectionReset, "share dropped"),
        );
        assert_eq!(default_error_class(&sidecar), ErrorClass::Transient);
    }

    #[test]
    fn test_message_signatures_classified() {
        assert_eq!(
            default_error_class(&EnrichError::Metadata("Network unreachable".into())),
            ErrorClass::Transient
        );
        assert_eq!(
            default_error_class(&EnrichError::Metadata("no tag found".into())),
            ErrorClass::Permanent
        );
        assert_eq!(
            default_error_class(&EnrichError::Timeout {
                operation: "extract".into(),
                timeout_ms: 100
            }),
            ErrorClass::Transient
        );
    }

    #[test]
    fn test_load_error_status_codes() {
        let conflict = ApiError::from(LoadError::SessionConflict {
            active: Uuid::new_v4(),
        });
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let empty = ApiError::from(LoadError::EmptyBatch { total: 2 });
        assert_eq!(empty.into_response().status(), StatusCode::BAD_REQUEST);

        let invalid = ApiError::from(LoadError::InvalidParameters("threshold".into()));
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let internal = ApiError::from(LoadError::Internal("join".into()));
        assert_eq!(
            internal.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
