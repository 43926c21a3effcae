//! Retry with exponential backoff
//!
//! **Algorithm:**
//! 1. Attempt operation
//! 2. If successful, return result with the transient-failure history
//! 3. On error, classify it:
//!    a. Permanent: return immediately (no retry)
//!    b. Transient and attempts remain: log WARN, back off, retry
//!    c. Transient and attempts exhausted: log ERROR, return exhaustion
//!
//! **Backoff Strategy:**
//! - Delay before retry n: `min(base * 2^(n-1) * jitter, max_delay)`
//! - Jitter drawn uniformly from 0.7-1.3
//!
//! Every attempt calls the operation afresh; nothing from a failed attempt is
//! handed to the next one.

use rand::Rng;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Retry eligibility of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network/timeout-class failure, worth retrying
    Transient,
    /// Retrying cannot help
    Permanent,
}

/// Attempt budget and backoff parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter_min: f64,
    jitter_max: f64,
}

impl RetryPolicy {
    /// Create policy with the default 0.7-1.3 jitter band
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            jitter_min: 0.7,
            jitter_max: 1.3,
        }
    }

    /// Disable jitter (deterministic delays)
    pub fn without_jitter(mut self) -> Self {
        self.jitter_min = 1.0;
        self.jitter_max = 1.0;
        self
    }

    /// Total attempts, first try included
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `retry` (1-based) for a given jitter factor
    pub fn delay_for_retry(&self, retry: u32, jitter: f64) -> Duration {
        let exponent = retry.saturating_sub(1).min(30);
        let scaled_ms = self.base_delay.as_millis() as f64 * f64::from(1u32 << exponent) * jitter;
        let capped_ms = scaled_ms.min(self.max_delay.as_millis() as f64).max(0.0);
        Duration::from_millis(capped_ms.round() as u64)
    }

    /// Draw a jitter factor from the configured band
    pub fn sample_jitter(&self) -> f64 {
        if self.jitter_max <= self.jitter_min {
            self.jitter_min
        } else {
            rand::thread_rng().gen_range(self.jitter_min..=self.jitter_max)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(1000), Duration::from_secs(10))
    }
}

/// Successful outcome
#[derive(Debug, Clone)]
pub struct Retried<T> {
    /// Operation result
    pub value: T,
    /// Attempts used (1 = first try succeeded)
    pub attempts: u32,
    /// Messages of the transient failures that preceded success
    pub transient_errors: Vec<String>,
}

/// Terminal failure
///
/// Permanent failures and exhaustion are kept apart so callers can report
/// exhaustion separately.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Operation failed with a permanent error
    #[error("{error} (permanent, attempt {attempts})")]
    Permanent {
        error: E,
        attempts: u32,
        transient_errors: Vec<String>,
    },

    /// Transient failures used every attempt
    #[error("{error} (retries exhausted after {attempts} attempts)")]
    Exhausted {
        error: E,
        attempts: u32,
        transient_errors: Vec<String>,
    },
}

impl<E> RetryError<E> {
    /// Final error
    pub fn error(&self) -> &E {
        match self {
            RetryError::Permanent { error, .. } | RetryError::Exhausted { error, .. } => error,
        }
    }

    /// Attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Permanent { attempts, .. } | RetryError::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    /// Transient failures seen before the terminal one
    pub fn transient_errors(&self) -> &[String] {
        match self {
            RetryError::Permanent {
                transient_errors, ..
            }
            | RetryError::Exhausted {
                transient_errors, ..
            } => transient_errors,
        }
    }

    /// True when the attempt budget ran out
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}

/// Run `operation` under `policy`, retrying transient failures
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g. the file being enriched)
/// * `policy` - Attempt budget and backoff
/// * `classify` - Maps an error to transient/permanent
/// * `operation` - Called with the 1-based attempt number
pub async fn with_retry<T, E, F, Fut, C>(
    operation_name: &str,
    policy: &RetryPolicy,
    classify: C,
    mut operation: F,
) -> Result<Retried<T>, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> ErrorClass,
    E: fmt::Display,
{
    let start_time = Instant::now();
    let mut transient_errors = Vec::new();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        if attempt > 1 {
            tracing::debug!(operation = operation_name, attempt, "Retrying operation");
        }

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis(),
                        "Operation succeeded after retry"
                    );
                }
                return Ok(Retried {
                    value,
                    attempts: attempt,
                    transient_errors,
                });
            }
            Err(err) => {
                if classify(&err) == ErrorClass::Permanent {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Permanent failure, not retrying"
                    );
                    return Err(RetryError::Permanent {
                        error: err,
                        attempts: attempt,
                        transient_errors,
                    });
                }

                if attempt >= policy.max_attempts() {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis(),
                        error = %err,
                        "Operation failed: retries exhausted"
                    );
                    return Err(RetryError::Exhausted {
                        error: err,
                        attempts: attempt,
                        transient_errors,
                    });
                }

                let backoff = policy.delay_for_retry(attempt, policy.sample_jitter());

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = backoff.as_millis(),
                    error = %err,
                    "Transient failure, will retry after backoff"
                );

                transient_errors.push(err.to_string());
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
