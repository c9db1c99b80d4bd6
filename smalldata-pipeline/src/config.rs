//! Configuration for the pipeline driver.

use std::time::Duration;

use crate::errors::PipelineError;
use crate::retry::{BackoffStrategy, RetryPolicy};

/// What happens to batches already in flight when a run is aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InFlightPolicy {
    /// Let every in-flight batch run to its natural resolution.
    #[default]
    Finish,
    /// Interrupt in-flight batches at their next wait or outstanding write.
    Abandon,
}

/// Immutable configuration handed to the driver at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of documents in one batch.
    pub max_batch_entries: usize,
    /// Maximum cumulative document bytes in one batch.
    pub max_batch_bytes: usize,
    /// Maximum number of write calls per batch, first attempt included.
    pub max_retry_attempts: u32,
    /// Delay policy between attempts.
    pub backoff: BackoffStrategy,
    /// Whether the endpoint creates a missing index on first write.
    pub index_auto_create: bool,
    /// Number of batches that may be written concurrently.
    pub max_concurrent_batches: usize,
    /// Treat a non-retryable batch failure as fatal for the whole run.
    pub abort_on_batch_fatal: bool,
    pub in_flight_on_abort: InFlightPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_batch_entries: 100_000,
            max_batch_bytes: 300_000_000,
            max_retry_attempts: 100,
            backoff: BackoffStrategy::Fixed(Duration::from_secs(600)),
            index_auto_create: true,
            max_concurrent_batches: 2,
            abort_on_batch_fatal: false,
            in_flight_on_abort: InFlightPolicy::Finish,
        }
    }
}

impl PipelineConfig {
    /// Check the limits that must be at least one.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_batch_entries == 0 {
            return Err(PipelineError::config("max_batch_entries must be at least 1"));
        }
        if self.max_batch_bytes == 0 {
            return Err(PipelineError::config("max_batch_bytes must be at least 1"));
        }
        if self.max_retry_attempts == 0 {
            return Err(PipelineError::config("max_retry_attempts must be at least 1"));
        }
        if self.max_concurrent_batches == 0 {
            return Err(PipelineError::config(
                "max_concurrent_batches must be at least 1",
            ));
        }
        Ok(())
    }

    /// Retry policy derived from this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retry_attempts,
            backoff: self.backoff.clone(),
        }
    }
}
