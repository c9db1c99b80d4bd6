//! Retry coordination for a single sealed batch.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use super::backoff::BackoffStrategy;
use smalldata_repository::IndexWriter;
use smalldata_shared::{AttemptOutcome, Batch, BatchReport, BatchResolution, WriteAttempt};

/// Bounds on how a single batch is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of write calls, first attempt included.
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            backoff: BackoffStrategy::default(),
        }
    }
}

/// Writes one batch through the index writer, retrying transient failures.
///
/// Attempts for a batch are strictly sequential. Every call is recorded as a
/// [`WriteAttempt`] in the returned [`BatchReport`].
pub struct RetryCoordinator {
    writer: Arc<dyn IndexWriter>,
    policy: RetryPolicy,
}

impl RetryCoordinator {
    pub fn new(writer: Arc<dyn IndexWriter>, policy: RetryPolicy) -> Self {
        Self { writer, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Write the batch until it succeeds, fails fatally or runs out of attempts.
    ///
    /// When `abort` is given, flipping it to `true` interrupts an outstanding
    /// write or backoff wait and the batch resolves as abandoned.
    #[instrument(
        skip(self, batch, abort),
        fields(batch_id = batch.id(), documents = batch.len())
    )]
    pub async fn dispatch(
        &self,
        batch: Batch,
        mut abort: Option<watch::Receiver<bool>>,
    ) -> BatchReport {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts: Vec<WriteAttempt> = Vec::new();
        let mut retry_wait = Duration::ZERO;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            debug!(attempt, "Batch dispatched");

            let started_at = Utc::now();
            let start = Instant::now();
            let result = tokio::select! {
                result = self.writer.write(&batch) => result,
                _ = wait_for_abort(&mut abort) => {
                    warn!(attempt, "Run aborted during write, abandoning batch");
                    return report(&batch, attempts, retry_wait, abandoned());
                }
            };
            let elapsed = start.elapsed();

            match result {
                Ok(ack) => {
                    attempts.push(WriteAttempt {
                        attempt,
                        outcome: AttemptOutcome::Success,
                        started_at,
                        elapsed,
                        item_failures: Vec::new(),
                    });
                    if attempt > 1 {
                        info!(attempt, items = ack.items, "Batch indexed after retry");
                    } else {
                        debug!(items = ack.items, "Batch indexed");
                    }
                    return report(&batch, attempts, retry_wait, BatchResolution::Succeeded);
                }
                Err(e) if e.is_retryable() => {
                    last_error = e.to_string();
                    attempts.push(WriteAttempt {
                        attempt,
                        outcome: AttemptOutcome::TransientFailure(last_error.clone()),
                        started_at,
                        elapsed,
                        item_failures: Vec::new(),
                    });

                    // Don't wait after the last attempt
                    if attempt < max_attempts {
                        let delay = self.policy.backoff.delay(attempt);
                        warn!(
                            attempt,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %last_error,
                            "Bulk write failed, retrying"
                        );

                        let wait_start = Instant::now();
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => retry_wait += delay,
                            _ = wait_for_abort(&mut abort) => {
                                retry_wait += wait_start.elapsed();
                                warn!(attempt, "Run aborted during backoff, abandoning batch");
                                return report(&batch, attempts, retry_wait, abandoned());
                            }
                        }
                    }
                }
                Err(e) => {
                    let reason = e.to_string();
                    error!(
                        attempt,
                        error = %reason,
                        "Non-retryable write failure, batch permanently failed"
                    );

                    attempts.push(WriteAttempt {
                        attempt,
                        outcome: AttemptOutcome::FatalFailure(reason.clone()),
                        started_at,
                        elapsed,
                        item_failures: e.item_failures().to_vec(),
                    });
                    let resolution = BatchResolution::PermanentlyFailed {
                        reason,
                        run_fatal: e.is_run_fatal(),
                    };
                    return report(&batch, attempts, retry_wait, resolution);
                }
            }
        }

        error!(
            attempts = max_attempts,
            error = %last_error,
            "Retries exhausted, batch permanently failed"
        );
        report(
            &batch,
            attempts,
            retry_wait,
            BatchResolution::PermanentlyFailed {
                reason: format!(
                    "retries exhausted after {} attempts: {}",
                    max_attempts, last_error
                ),
                run_fatal: false,
            },
        )
    }
}

fn abandoned() -> BatchResolution {
    BatchResolution::Abandoned {
        reason: "run aborted".to_string(),
    }
}

fn report(
    batch: &Batch,
    attempts: Vec<WriteAttempt>,
    retry_wait: Duration,
    resolution: BatchResolution,
) -> BatchReport {
    BatchReport {
        batch_id: batch.id(),
        document_count: batch.len(),
        attempts,
        retry_wait,
        resolution,
    }
}

/// Resolve once the abort flag is raised; never resolve without a receiver.
pub(crate) async fn wait_for_abort(abort: &mut Option<watch::Receiver<bool>>) {
    match abort {
        Some(rx) => {
            let closed = rx.wait_for(|aborted| *aborted).await.is_err();
            if closed {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}
