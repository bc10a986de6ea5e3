//! Retry and bounded-batch utilities.
//!
//! `retry_with_backoff` re-runs a fallible async operation with exponential
//! backoff, stopping early on errors that declare themselves non-retryable.
//! `run_batch` drives per-item async work with at most N operations in flight
//! and records a tagged outcome for every item.

use crate::error::{ImageError, PipelineError};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

/// Errors that know whether another attempt may succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for PipelineError {
    fn is_retryable(&self) -> bool {
        PipelineError::is_retryable(self)
    }
}

impl Retryable for ImageError {
    fn is_retryable(&self) -> bool {
        ImageError::is_retryable(self)
    }
}

/// Exponential backoff parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempt ceiling, the first call included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    8_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based), capped at `max_delay_ms`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let millis = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

/// Terminal outcome of `retry_with_backoff`
#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },

    #[error(transparent)]
    NonRetryable(E),
}

impl<E> RetryError<E> {
    /// Underlying error of the final attempt.
    pub fn into_last(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::NonRetryable(err) => err,
        }
    }
}

impl From<RetryError<PipelineError>> for PipelineError {
    fn from(err: RetryError<PipelineError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => PipelineError::RetriesExhausted {
                attempts,
                last: Box::new(last),
            },
            RetryError::NonRetryable(err) => err,
        }
    }
}

/// Run `operation` until it succeeds, fails non-retryably, or the policy's
/// attempt ceiling is reached.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(RetryError::NonRetryable(err)),
            Err(err) if attempt >= max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                })
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Operation failed; retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Progress snapshot reported after each completed item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

pub type ProgressCallback = Arc<dyn Fn(BatchProgress) + Send + Sync>;

/// Batch execution options
#[derive(Clone)]
pub struct BatchOptions {
    /// Maximum operations in flight
    pub concurrency: usize,
    /// Stop launching new items after the first failure
    pub stop_on_first_error: bool,
    pub on_progress: Option<ProgressCallback>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 2,
            stop_on_first_error: false,
            on_progress: None,
        }
    }
}

impl BatchOptions {
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Self::default()
        }
    }
}

/// Outcome recorded for one batch item
#[derive(Debug)]
pub enum BatchOutcome<T, E> {
    Success(T),
    Failure(E),
    /// Never started, or cancelled by `stop_on_first_error`
    Skipped,
}

impl<T, E> BatchOutcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Success(_))
    }
}

/// Outcomes of a batch, in input order
#[derive(Debug)]
pub struct BatchReport<T, E> {
    pub outcomes: Vec<BatchOutcome<T, E>>,
}

impl<T, E> BatchReport<T, E> {
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, BatchOutcome::Failure(_)))
            .count()
    }

    pub fn successes(self) -> impl Iterator<Item = T> {
        self.outcomes.into_iter().filter_map(|o| match o {
            BatchOutcome::Success(value) => Some(value),
            _ => None,
        })
    }
}

/// Run `operation` over `items` keeping at most `options.concurrency` in flight.
pub async fn run_batch<I, T, E, F, Fut>(
    items: Vec<I>,
    options: &BatchOptions,
    operation: F,
) -> BatchReport<T, E>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let total = items.len();
    let window = options.concurrency.max(1);
    let mut outcomes: Vec<BatchOutcome<T, E>> = (0..total).map(|_| BatchOutcome::Skipped).collect();
    let mut pending = items.into_iter().enumerate();
    let mut in_flight = FuturesUnordered::new();
    let mut completed = 0usize;
    let mut failed = 0usize;
    let mut stopping = false;

    let launch = |index: usize, item: I| {
        let fut = operation(item);
        async move { (index, fut.await) }
    };

    for (index, item) in pending.by_ref().take(window) {
        in_flight.push(launch(index, item));
    }

    while let Some((index, result)) = in_flight.next().await {
        completed += 1;
        match result {
            Ok(value) => outcomes[index] = BatchOutcome::Success(value),
            Err(err) => {
                failed += 1;
                outcomes[index] = BatchOutcome::Failure(err);
                if options.stop_on_first_error {
                    stopping = true;
                }
            }
        }

        if let Some(callback) = &options.on_progress {
            callback(BatchProgress {
                completed,
                failed,
                total,
            });
        }

        if stopping {
            // Dropping the remaining futures cancels them; they stay Skipped.
            break;
        }
        if let Some((next_index, item)) = pending.next() {
            in_flight.push(launch(next_index, item));
        }
    }

    BatchReport { outcomes }
}
