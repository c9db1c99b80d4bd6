//! Write attempts, per-batch resolutions and the aggregate run report.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A document the endpoint rejected inside an otherwise accepted bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Identifier of the rejected document.
    pub id: String,
    /// Per-item HTTP status reported by the endpoint.
    pub status: u16,
    /// Error type and reason reported by the endpoint.
    pub reason: String,
}

/// Outcome of one bulk write call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AttemptOutcome {
    Success,
    TransientFailure(String),
    FatalFailure(String),
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Record of one dispatch of a batch to the index writer.
#[derive(Debug, Clone, Serialize)]
pub struct WriteAttempt {
    /// 1-based attempt number within the batch.
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Per-document failures, when the endpoint reported them.
    pub item_failures: Vec<ItemFailure>,
}

/// Terminal state of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BatchResolution {
    /// The endpoint acknowledged every document.
    Succeeded,
    /// Retries were exhausted or the failure was not retryable.
    ///
    /// `run_fatal` is set when the failure must abort the whole run.
    PermanentlyFailed { reason: String, run_fatal: bool },
    /// The run was aborted before the batch could be resolved by a write.
    Abandoned { reason: String },
}

/// Full account of how one batch was resolved.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: u64,
    pub document_count: usize,
    pub attempts: Vec<WriteAttempt>,
    /// Total time spent waiting between attempts.
    pub retry_wait: Duration,
    pub resolution: BatchResolution,
}

impl BatchReport {
    /// Number of attempts beyond the first.
    pub fn retries(&self) -> u32 {
        self.attempts.len().saturating_sub(1) as u32
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.resolution, BatchResolution::Succeeded)
    }

    /// Whether this resolution requires the run to stop.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self.resolution,
            BatchResolution::PermanentlyFailed {
                run_fatal: true,
                ..
            }
        )
    }
}

/// Aggregate counters for a pipeline run.
///
/// Once a run completes, `documents_submitted` always equals
/// `documents_indexed + documents_failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineResult {
    pub documents_submitted: u64,
    pub documents_indexed: u64,
    /// Permanently failed documents, abandoned ones included.
    pub documents_failed: u64,
    /// Documents that were submitted but never written because the run aborted.
    pub documents_abandoned: u64,
    pub batches_dispatched: u64,
    /// Batches that needed at least one retry.
    pub batches_retried: u64,
    pub retry_attempts: u64,
    pub retry_wait: Duration,
    pub elapsed: Duration,
}

impl PipelineResult {
    /// Fold one resolved batch into the counters.
    pub fn record_batch(&mut self, report: &BatchReport) {
        let count = report.document_count as u64;
        self.batches_dispatched += 1;

        let retries = report.retries() as u64;
        if retries > 0 {
            self.batches_retried += 1;
            self.retry_attempts += retries;
        }
        self.retry_wait += report.retry_wait;

        match report.resolution {
            BatchResolution::Succeeded => self.documents_indexed += count,
            BatchResolution::PermanentlyFailed { .. } => self.documents_failed += count,
            BatchResolution::Abandoned { .. } => {
                self.documents_failed += count;
                self.documents_abandoned += count;
            }
        }
    }

    /// Count documents that were pulled from the source but never dispatched.
    pub fn record_undispatched(&mut self, count: u64) {
        self.documents_failed += count;
        self.documents_abandoned += count;
    }

    /// Whether every submitted document is accounted for.
    pub fn is_balanced(&self) -> bool {
        self.documents_submitted == self.documents_indexed + self.documents_failed
    }
}
