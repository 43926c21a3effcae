//! Bounded-concurrency batch execution
//!
//! Runs one async operation per item with at most `max_concurrent`
//! outstanding at any instant. As each operation finishes the next queued
//! item is admitted. Results come back index-aligned with the input
//! regardless of completion order.
//!
//! Operations report failure through their `Result`; a failed item never
//! stops, delays or cancels any other item.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Bounded-concurrency executor
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyScheduler {
    max_concurrent: usize,
}

impl ConcurrencyScheduler {
    /// Create scheduler; a ceiling of zero is treated as one
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Concurrency ceiling
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Run `operation` over every item
    ///
    /// `operation` receives the item's index and the item. Slot `i` of the
    /// returned vector holds the outcome of `items[i]`.
    pub async fn run_all<I, T, E, F, Fut>(&self, items: Vec<I>, operation: F) -> Vec<Result<T, E>>
    where
        F: Fn(usize, I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let total = items.len();

        tracing::debug!(
            items = total,
            max_concurrent = self.max_concurrent,
            "Scheduler starting batch"
        );

        let mut outcomes: Vec<(usize, Result<T, E>)> = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| {
                let pending = operation(index, item);
                async move { (index, pending.await) }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        outcomes.sort_by_key(|(index, _)| *index);

        let failed = outcomes.iter().filter(|(_, r)| r.is_err()).count();
        tracing::debug!(
            items = total,
            successful = total - failed,
            failed,
            "Scheduler batch completed"
        );

        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}
