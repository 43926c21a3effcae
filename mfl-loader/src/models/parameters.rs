//! Load parameters
//!
//! Runtime projection of `LoaderConfig`. Also accepted as JSON on the HTTP
//! start endpoint, so every field has a serde default.

use mfl_common::config::{default_primary_extensions, LoaderConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LoadError;
use crate::services::retry::RetryPolicy;

/// Load workflow parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadParameters {
    /// Ceiling on outstanding enrichment operations (default: 3)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Total attempts per enrichment operation (default: 2)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay before the first retry in milliseconds (default: 1000)
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Cap on any single retry delay in milliseconds (default: 10000)
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Minimum fuzzy similarity for a sidecar match (default: 0.8)
    #[serde(default = "default_fuzzy_match_threshold")]
    pub fuzzy_match_threshold: f64,

    /// Entries per standard-mode chunk (default: 10)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Stub-first progressive delivery (default: true)
    #[serde(default = "default_progressive_mode")]
    pub progressive_mode: bool,

    /// Entries enriched first, in sequence (default: 3)
    #[serde(default = "default_priority_count")]
    pub priority_count: usize,

    /// Duration probe timeout in milliseconds (default: 3500)
    #[serde(default = "default_duration_probe_timeout_ms")]
    pub duration_probe_timeout_ms: u64,

    /// Extensions classified as primary media
    #[serde(default = "default_primary_extensions")]
    pub primary_extensions: Vec<String>,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_retry_max_delay_ms() -> u64 {
    10_000
}

fn default_fuzzy_match_threshold() -> f64 {
    0.8
}

fn default_chunk_size() -> usize {
    10
}

fn default_progressive_mode() -> bool {
    true
}

fn default_priority_count() -> usize {
    3
}

fn default_duration_probe_timeout_ms() -> u64 {
    3500
}

impl Default for LoadParameters {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            fuzzy_match_threshold: default_fuzzy_match_threshold(),
            chunk_size: default_chunk_size(),
            progressive_mode: default_progressive_mode(),
            priority_count: default_priority_count(),
            duration_probe_timeout_ms: default_duration_probe_timeout_ms(),
            primary_extensions: default_primary_extensions(),
        }
    }
}

impl From<&LoaderConfig> for LoadParameters {
    fn from(config: &LoaderConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent,
            retry_attempts: config.retry_attempts,
            retry_base_delay_ms: config.retry_base_delay_ms,
            retry_max_delay_ms: config.retry_max_delay_ms,
            fuzzy_match_threshold: config.fuzzy_match_threshold,
            chunk_size: config.chunk_size,
            progressive_mode: config.progressive_mode,
            priority_count: config.priority_count,
            duration_probe_timeout_ms: config.duration_probe_timeout_ms,
            primary_extensions: config.primary_extensions.clone(),
        }
    }
}

impl LoadParameters {
    /// Reject values the pipeline cannot run with
    ///
    /// Same bounds `LoaderConfig::validate` enforces on the TOML path.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.max_concurrent == 0 {
            return Err(LoadError::InvalidParameters(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(LoadError::InvalidParameters(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(LoadError::InvalidParameters(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.fuzzy_match_threshold) {
            return Err(LoadError::InvalidParameters(format!(
                "fuzzy_match_threshold must be within 0.0-1.0, got {}",
                self.fuzzy_match_threshold
            )));
        }
        if self.retry_max_delay_ms < self.retry_base_delay_ms {
            return Err(LoadError::InvalidParameters(
                "retry_max_delay_ms must not be below retry_base_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Retry policy derived from the attempt and delay settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts.max(1),
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms.max(self.retry_base_delay_ms)),
        )
    }

    /// Duration probe timeout
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.duration_probe_timeout_ms)
    }

    /// Concurrency ceiling, never below one
    pub fn effective_max_concurrent(&self) -> usize {
        self.max_concurrent.max(1)
    }

    /// Chunk size, never below one
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }
}
