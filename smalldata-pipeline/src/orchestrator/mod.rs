//! Pipeline driver.
//!
//! Pulls documents from a source, seals them into batches and dispatches the
//! batches through the retry coordinator, folding every resolution into the
//! run report.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::batcher::{AddOutcome, Batcher};
use crate::config::{InFlightPolicy, PipelineConfig};
use crate::errors::PipelineError;
use crate::retry::{wait_for_abort, RetryCoordinator};
use crate::source::DocumentSource;
use smalldata_repository::IndexWriter;
use smalldata_shared::{AttemptOutcome, Batch, BatchReport, BatchResolution, PipelineResult};

/// Drives one load run from a document source into an index writer.
///
/// The configuration and writer are fixed at construction; each call to
/// [`PipelineDriver::run`] is an independent run with its own counters.
/// [`PipelineDriver::run_until`] additionally stops the run when a shutdown
/// flag is raised, going through the same abort path as any other run-level
/// failure.
pub struct PipelineDriver {
    writer: Arc<dyn IndexWriter>,
    config: PipelineConfig,
}

/// Abort reason when the shutdown flag is raised.
const INTERRUPTED: &str = "interrupted";

/// Mutable state of a single run, owned by the driver task.
struct RunState {
    result: PipelineResult,
    abort_reason: Option<String>,
    abort_tx: watch::Sender<bool>,
}

impl RunState {
    fn abort(&mut self, reason: String) {
        if self.abort_reason.is_none() {
            error!(reason = %reason, "Aborting run");
            self.abort_reason = Some(reason);
            self.abort_tx.send_replace(true);
        }
    }

    fn aborted(&self) -> bool {
        self.abort_reason.is_some()
    }
}

impl PipelineDriver {
    /// Create a driver, validating the configuration.
    pub fn new(
        writer: Arc<dyn IndexWriter>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { writer, config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load every document of `source` into the target index.
    ///
    /// Returns the aggregate report when the source was drained and every
    /// batch resolved, even if some batches permanently failed. A run-level
    /// failure returns [`PipelineError::RunAborted`] with the partial report.
    pub async fn run<S>(&self, source: &mut S) -> Result<PipelineResult, PipelineError>
    where
        S: DocumentSource + ?Sized,
    {
        self.execute(source, None).await
    }

    /// Like [`PipelineDriver::run`], but aborts once `shutdown` turns `true`.
    ///
    /// In-flight batches then finish or are abandoned per
    /// `in_flight_on_abort`, the writer is finished and the partial report
    /// comes back in [`PipelineError::RunAborted`].
    pub async fn run_until<S>(
        &self,
        source: &mut S,
        shutdown: watch::Receiver<bool>,
    ) -> Result<PipelineResult, PipelineError>
    where
        S: DocumentSource + ?Sized,
    {
        self.execute(source, Some(shutdown)).await
    }

    #[instrument(
        skip_all,
        fields(run_id = %Uuid::new_v4(), target = %self.writer.target())
    )]
    async fn execute<S>(
        &self,
        source: &mut S,
        mut shutdown: Option<watch::Receiver<bool>>,
    ) -> Result<PipelineResult, PipelineError>
    where
        S: DocumentSource + ?Sized,
    {
        let start = Instant::now();
        info!(
            max_batch_entries = self.config.max_batch_entries,
            max_batch_bytes = self.config.max_batch_bytes,
            max_retry_attempts = self.config.max_retry_attempts,
            max_concurrent_batches = self.config.max_concurrent_batches,
            "Starting load run"
        );

        let (abort_tx, abort_rx) = watch::channel(false);
        let mut state = RunState {
            result: PipelineResult::default(),
            abort_reason: None,
            abort_tx,
        };

        if !self.config.index_auto_create {
            match self.writer.index_exists().await {
                Ok(true) => debug!("Target index exists"),
                Ok(false) => state.abort(format!(
                    "target index {} does not exist and auto-create is disabled",
                    self.writer.target()
                )),
                Err(e) => state.abort(format!("failed to check target index: {}", e)),
            }
        }

        if !state.aborted() {
            self.drive(source, &mut state, abort_rx, &mut shutdown).await;
        }

        // Whatever was pulled but never resolved by a write is abandoned
        let resolved = state.result.documents_indexed + state.result.documents_failed;
        let unresolved = state.result.documents_submitted.saturating_sub(resolved);
        if unresolved > 0 {
            warn!(documents = unresolved, "Documents never dispatched");
            state.result.record_undispatched(unresolved);
        }

        let finish_result = self.writer.finish().await;
        state.result.elapsed = start.elapsed();
        log_summary(&state.result);

        match state.abort_reason {
            Some(reason) => {
                if let Err(e) = finish_result {
                    warn!(error = %e, "Failed to finish writer after abort");
                }
                Err(PipelineError::aborted(reason, state.result))
            }
            None => {
                finish_result?;
                Ok(state.result)
            }
        }
    }

    async fn drive<S>(
        &self,
        source: &mut S,
        state: &mut RunState,
        abort_rx: watch::Receiver<bool>,
        shutdown: &mut Option<watch::Receiver<bool>>,
    ) where
        S: DocumentSource + ?Sized,
    {
        let coordinator = Arc::new(RetryCoordinator::new(
            self.writer.clone(),
            self.config.retry_policy(),
        ));
        let abort = match self.config.in_flight_on_abort {
            InFlightPolicy::Abandon => Some(abort_rx),
            InFlightPolicy::Finish => None,
        };
        let mut batcher = Batcher::from_config(&self.config);
        let mut in_flight: JoinSet<BatchReport> = JoinSet::new();

        loop {
            while let Some(joined) = in_flight.try_join_next() {
                self.absorb(joined, state);
            }
            if state.aborted() {
                break;
            }

            let next = tokio::select! {
                biased;
                _ = wait_for_abort(shutdown) => {
                    state.abort(INTERRUPTED.to_string());
                    break;
                }
                next = source.next_document() => next,
            };

            match next {
                Ok(Some(document)) => {
                    state.result.documents_submitted += 1;
                    if let AddOutcome::BatchReady(batch) = batcher.add(document) {
                        self.dispatch(
                            batch,
                            &coordinator,
                            &abort,
                            &mut in_flight,
                            state,
                            shutdown,
                        )
                        .await;
                    }
                }
                Ok(None) => {
                    debug!("Source exhausted");
                    if let Some(batch) = batcher.flush() {
                        self.dispatch(
                            batch,
                            &coordinator,
                            &abort,
                            &mut in_flight,
                            state,
                            shutdown,
                        )
                        .await;
                    }
                    break;
                }
                Err(e) => {
                    state.abort(format!("source error: {}", e));
                    break;
                }
            }
        }

        if state.aborted() && batcher.pending() > 0 {
            warn!(documents = batcher.pending(), "Dropping open batch after abort");
        }

        loop {
            let interruptible = !state.aborted();
            tokio::select! {
                biased;
                _ = wait_for_abort(shutdown), if interruptible => {
                    state.abort(INTERRUPTED.to_string());
                }
                joined = in_flight.join_next() => match joined {
                    Some(joined) => self.absorb(joined, state),
                    None => break,
                },
            }
        }
    }

    /// Wait for a free slot, then spawn the batch unless the run was aborted meanwhile.
    async fn dispatch(
        &self,
        batch: Batch,
        coordinator: &Arc<RetryCoordinator>,
        abort: &Option<watch::Receiver<bool>>,
        in_flight: &mut JoinSet<BatchReport>,
        state: &mut RunState,
        shutdown: &mut Option<watch::Receiver<bool>>,
    ) {
        while in_flight.len() >= self.config.max_concurrent_batches && !state.aborted() {
            tokio::select! {
                biased;
                _ = wait_for_abort(shutdown) => state.abort(INTERRUPTED.to_string()),
                joined = in_flight.join_next() => match joined {
                    Some(joined) => self.absorb(joined, state),
                    None => break,
                },
            }
        }

        if state.aborted() {
            warn!(
                batch_id = batch.id(),
                documents = batch.len(),
                "Run aborted, batch not dispatched"
            );
            return;
        }

        debug!(batch_id = batch.id(), documents = batch.len(), "Dispatching batch");

        let batch_id = batch.id();
        let document_count = batch.len();
        let coordinator = coordinator.clone();
        let abort = abort.clone();
        in_flight.spawn(async move {
            AssertUnwindSafe(coordinator.dispatch(batch, abort))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| BatchReport {
                    batch_id,
                    document_count,
                    attempts: Vec::new(),
                    retry_wait: Duration::ZERO,
                    resolution: BatchResolution::PermanentlyFailed {
                        reason: "dispatch task panicked".to_string(),
                        run_fatal: true,
                    },
                })
        });
    }

    /// Fold one finished dispatch into the run state.
    fn absorb(&self, joined: Result<BatchReport, JoinError>, state: &mut RunState) {
        let report = match joined {
            Ok(report) => report,
            Err(e) => {
                state.abort(format!("dispatch task failed: {}", e));
                return;
            }
        };

        state.result.record_batch(&report);

        match &report.resolution {
            BatchResolution::Succeeded => {
                debug!(batch_id = report.batch_id, "Batch succeeded");
            }
            BatchResolution::Abandoned { reason } => {
                warn!(batch_id = report.batch_id, reason = %reason, "Batch abandoned");
            }
            BatchResolution::PermanentlyFailed { reason, run_fatal } => {
                warn!(
                    batch_id = report.batch_id,
                    documents = report.document_count,
                    reason = %reason,
                    "Batch permanently failed"
                );

                let fatal_write = matches!(
                    report.attempts.last().map(|a| &a.outcome),
                    Some(AttemptOutcome::FatalFailure(_))
                );
                if *run_fatal || (self.config.abort_on_batch_fatal && fatal_write) {
                    state.abort(format!("batch {} failed: {}", report.batch_id, reason));
                }
            }
        }
    }
}

fn log_summary(result: &PipelineResult) {
    let secs = result.elapsed.as_secs();
    info!(
        documents_submitted = result.documents_submitted,
        documents_indexed = result.documents_indexed,
        documents_failed = result.documents_failed,
        documents_abandoned = result.documents_abandoned,
        batches_dispatched = result.batches_dispatched,
        batches_retried = result.batches_retried,
        retry_attempts = result.retry_attempts,
        retry_wait_secs = result.retry_wait.as_secs(),
        "Finished in {}m{}s",
        secs / 60,
        secs % 60
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceError;
    use crate::retry::BackoffStrategy;
    use crate::source::VecSource;
    use crate::test_support::{ack, docs, ScriptedWriter};
    use async_trait::async_trait;
    use serde_json::json;
    use smalldata_repository::IndexWriteError;
    use smalldata_shared::Document;

    fn config(max_batch_entries: usize) -> PipelineConfig {
        PipelineConfig {
            max_batch_entries,
            backoff: BackoffStrategy::Fixed(Duration::from_secs(600)),
            ..Default::default()
        }
    }

    fn driver(writer: &Arc<ScriptedWriter>, config: PipelineConfig) -> PipelineDriver {
        PipelineDriver::new(writer.clone(), config).unwrap()
    }

    /// Yields `count` documents, then fails.
    struct FailingSource {
        inner: VecSource,
    }

    impl FailingSource {
        fn new(count: usize) -> Self {
            Self {
                inner: VecSource::from(docs(count)),
            }
        }
    }

    #[async_trait]
    impl DocumentSource for FailingSource {
        async fn next_document(&mut self) -> Result<Option<Document>, SourceError> {
            match self.inner.next_document().await? {
                Some(doc) => Ok(Some(doc)),
                None => Err(SourceError::parse(99, "unexpected end of record")),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_loads_everything_in_order() {
        let writer = Arc::new(ScriptedWriter::always_ok());
        let mut source = VecSource::from(docs(7));

        let result = driver(&writer, config(3)).run(&mut source).await.unwrap();

        assert_eq!(result.documents_submitted, 7);
        assert_eq!(result.documents_indexed, 7);
        assert_eq!(result.documents_failed, 0);
        assert_eq!(result.batches_dispatched, 3);
        assert_eq!(writer.calls_for(0), 1);
        assert_eq!(writer.calls_for(1), 1);
        assert_eq!(writer.calls_for(2), 1);
        assert_eq!(writer.calls_for(3), 0);
        assert!(writer.finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_source() {
        let writer = Arc::new(ScriptedWriter::always_ok());
        let mut source = VecSource::default();

        let result = driver(&writer, config(3)).run(&mut source).await.unwrap();

        assert_eq!(result.documents_submitted, 0);
        assert_eq!(result.batches_dispatched, 0);
        assert!(result.is_balanced());
        assert_eq!(writer.total_calls(), 0);
        assert!(writer.finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_document_gets_own_batch() {
        let writer = Arc::new(ScriptedWriter::always_ok());
        let big = Document::from_json("big", &json!({ "p": "x".repeat(512) })).unwrap();
        let mut documents = docs(2);
        documents.insert(1, big);
        let mut source = VecSource::from(documents);

        let config = PipelineConfig {
            max_batch_bytes: 64,
            ..config(100)
        };
        let result = driver(&writer, config).run(&mut source).await.unwrap();

        assert_eq!(result.documents_indexed, 3);
        assert_eq!(result.batches_dispatched, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counters_balance_across_configs() {
        for (entries, bytes, concurrency, count) in [
            (1, 1_000, 1, 10),
            (3, 1_000, 2, 25),
            (4, 40, 3, 31),
            (100, 1_000_000, 4, 9),
            (7, 1_000, 8, 100),
        ] {
            let writer = Arc::new(ScriptedWriter::new(|batch, attempt| {
                match (batch.id() % 3, attempt) {
                    (0, _) if batch.id() % 2 == 1 => {
                        Err(IndexWriteError::fatal("400 Bad Request"))
                    }
                    (1, 1) => Err(IndexWriteError::transient("503 Service Unavailable")),
                    (2, _) => Err(IndexWriteError::transient("timeout")),
                    _ => Ok(ack(batch)),
                }
            }));
            let config = PipelineConfig {
                max_batch_entries: entries,
                max_batch_bytes: bytes,
                max_retry_attempts: 3,
                max_concurrent_batches: concurrency,
                ..config(entries)
            };
            let mut source = VecSource::from(docs(count));

            let result = driver(&writer, config).run(&mut source).await.unwrap();

            assert_eq!(result.documents_submitted, count as u64);
            assert!(result.is_balanced(), "unbalanced for {:?}", result);
            assert_eq!(result.documents_abandoned, 0);
            assert!(!writer.overlap_detected());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let writer = Arc::new(
            ScriptedWriter::always_ok().with_latency(Duration::from_millis(50)),
        );
        let mut source = VecSource::from(docs(40));
        let config = PipelineConfig {
            max_concurrent_batches: 3,
            ..config(2)
        };

        let result = driver(&writer, config).run(&mut source).await.unwrap();

        assert_eq!(result.documents_indexed, 40);
        assert_eq!(result.batches_dispatched, 20);
        assert!(writer.peak_concurrency() <= 3);
        assert!(writer.peak_concurrency() > 1);
        assert!(!writer.overlap_detected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_counted() {
        let writer = Arc::new(ScriptedWriter::new(|batch, attempt| {
            if batch.id() == 1 && attempt <= 2 {
                Err(IndexWriteError::transient("429 Too Many Requests"))
            } else {
                Ok(ack(batch))
            }
        }));
        let mut source = VecSource::from(docs(6));

        let result = driver(&writer, config(2)).run(&mut source).await.unwrap();

        assert_eq!(result.documents_indexed, 6);
        assert_eq!(result.batches_retried, 1);
        assert_eq!(result.retry_attempts, 2);
        assert_eq!(result.retry_wait, Duration::from_secs(1200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_index_aborts_before_any_write() {
        let writer = Arc::new(ScriptedWriter::always_ok().with_index_exists(false));
        let mut source = VecSource::from(docs(5));
        let config = PipelineConfig {
            index_auto_create: false,
            ..config(2)
        };

        let err = driver(&writer, config).run(&mut source).await.unwrap_err();

        match err {
            PipelineError::RunAborted { reason, result } => {
                assert!(reason.contains("does not exist"));
                assert_eq!(result.documents_submitted, 0);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(writer.total_calls(), 0);
        assert_eq!(source.remaining(), 5);
        assert!(writer.finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_index_is_loaded_without_auto_create() {
        let writer = Arc::new(ScriptedWriter::always_ok());
        let mut source = VecSource::from(docs(5));
        let config = PipelineConfig {
            index_auto_create: false,
            ..config(2)
        };

        let result = driver(&writer, config).run(&mut source).await.unwrap();

        assert_eq!(result.documents_indexed, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_index_missing_mid_run_aborts() {
        let writer = Arc::new(ScriptedWriter::new(|batch, _| {
            if batch.id() == 1 {
                Err(IndexWriteError::index_missing("users"))
            } else {
                Ok(ack(batch))
            }
        }));
        let mut source = VecSource::from(docs(20));
        let config = PipelineConfig {
            max_concurrent_batches: 1,
            ..config(2)
        };

        let err = driver(&writer, config).run(&mut source).await.unwrap_err();

        let result = err.partial_result().unwrap().clone();
        assert!(matches!(err, PipelineError::RunAborted { .. }));
        assert!(result.is_balanced());
        assert_eq!(result.documents_indexed, 2);
        assert!(result.documents_submitted < 20);
        assert_eq!(writer.calls_for(1), 1);
        assert_eq!(writer.calls_for(2), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_fatal_continues_by_default() {
        let writer = Arc::new(ScriptedWriter::new(|batch, _| {
            if batch.id() == 1 {
                Err(IndexWriteError::fatal("400 Bad Request"))
            } else {
                Ok(ack(batch))
            }
        }));
        let mut source = VecSource::from(docs(6));

        let result = driver(&writer, config(2)).run(&mut source).await.unwrap();

        assert_eq!(result.documents_indexed, 4);
        assert_eq!(result.documents_failed, 2);
        assert_eq!(result.documents_abandoned, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_on_batch_fatal() {
        let writer = Arc::new(ScriptedWriter::new(|batch, _| {
            if batch.id() == 1 {
                Err(IndexWriteError::fatal("400 Bad Request"))
            } else {
                Ok(ack(batch))
            }
        }));
        let mut source = VecSource::from(docs(20));
        let config = PipelineConfig {
            abort_on_batch_fatal: true,
            max_concurrent_batches: 1,
            ..config(2)
        };

        let err = driver(&writer, config).run(&mut source).await.unwrap_err();

        match err {
            PipelineError::RunAborted { reason, result } => {
                assert!(reason.contains("batch 1"));
                assert!(result.is_balanced());
                assert!(result.documents_failed >= 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_error_lets_in_flight_finish() {
        let writer = Arc::new(ScriptedWriter::new(|batch, attempt| {
            if attempt < 3 {
                Err(IndexWriteError::transient("503 Service Unavailable"))
            } else {
                Ok(ack(batch))
            }
        }));
        let mut source = FailingSource::new(5);
        let config = PipelineConfig {
            max_retry_attempts: 3,
            ..config(2)
        };

        let err = driver(&writer, config).run(&mut source).await.unwrap_err();

        match err {
            PipelineError::RunAborted { reason, result } => {
                assert!(reason.contains("source error"));
                assert_eq!(result.documents_submitted, 5);
                assert_eq!(result.documents_indexed, 4);
                assert_eq!(result.documents_abandoned, 1);
                assert!(result.is_balanced());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(writer.finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandon_policy_interrupts_backoff() {
        let writer = Arc::new(ScriptedWriter::new(|_, _| {
            Err(IndexWriteError::transient("503 Service Unavailable"))
        }));
        let mut source = FailingSource::new(4);
        let config = PipelineConfig {
            in_flight_on_abort: InFlightPolicy::Abandon,
            ..config(2)
        };

        let started = Instant::now();
        let err = driver(&writer, config).run(&mut source).await.unwrap_err();

        let result = err.partial_result().unwrap();
        assert_eq!(result.documents_submitted, 4);
        assert_eq!(result.documents_indexed, 0);
        assert_eq!(result.documents_abandoned, 4);
        assert!(result.is_balanced());
        // Never sat out a full backoff
        assert!(started.elapsed() < Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_dispatch_aborts_run() {
        let writer = Arc::new(ScriptedWriter::new(|batch, _| {
            if batch.id() == 0 {
                panic!("writer blew up");
            }
            Ok(ack(batch))
        }));
        let mut source = VecSource::from(docs(3));

        let err = driver(&writer, config(2)).run(&mut source).await.unwrap_err();

        match err {
            PipelineError::RunAborted { reason, result } => {
                assert!(reason.contains("panicked"));
                assert!(result.is_balanced());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    fn interrupt_after(delay: Duration) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send_replace(true);
            // Keep the sender alive until the run is over
            tx.closed().await;
        });
        rx
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_lets_in_flight_finish() {
        let writer = Arc::new(ScriptedWriter::always_ok().with_latency(Duration::from_secs(5)));
        let mut source = VecSource::from(docs(10));

        let err = driver(&writer, config(2))
            .run_until(&mut source, interrupt_after(Duration::from_secs(6)))
            .await
            .unwrap_err();

        match err {
            PipelineError::RunAborted { reason, result } => {
                assert_eq!(reason, "interrupted");
                assert!(result.is_balanced());
                assert!(result.documents_abandoned > 0);
                // Nothing in flight was cut short
                assert_eq!(result.documents_failed, result.documents_abandoned);
                assert_eq!(
                    result.documents_indexed,
                    result.documents_submitted - result.documents_abandoned
                );
                assert!(result.documents_indexed >= 4);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(writer.finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_abandons_in_flight() {
        let writer = Arc::new(ScriptedWriter::always_ok().with_latency(Duration::from_secs(5)));
        let mut source = VecSource::from(docs(10));
        let config = PipelineConfig {
            in_flight_on_abort: InFlightPolicy::Abandon,
            ..config(2)
        };

        let started = Instant::now();
        let err = driver(&writer, config)
            .run_until(&mut source, interrupt_after(Duration::from_secs(6)))
            .await
            .unwrap_err();

        let result = err.partial_result().unwrap();
        assert!(result.is_balanced());
        assert!(result.documents_abandoned > 0);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(writer.finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_raised_shutdown_stops_before_reading() {
        let writer = Arc::new(ScriptedWriter::always_ok());
        let mut source = VecSource::from(docs(5));
        let (_tx, rx) = watch::channel(true);

        let err = driver(&writer, config(2))
            .run_until(&mut source, rx)
            .await
            .unwrap_err();

        let result = err.partial_result().unwrap();
        assert_eq!(result.documents_submitted, 0);
        assert_eq!(source.remaining(), 5);
        assert_eq!(writer.total_calls(), 0);
        assert!(writer.finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unraised_shutdown_runs_to_completion() {
        let writer = Arc::new(ScriptedWriter::always_ok());
        let mut source = VecSource::from(docs(5));
        let (_tx, rx) = watch::channel(false);

        let result = driver(&writer, config(2))
            .run_until(&mut source, rx)
            .await
            .unwrap();

        assert_eq!(result.documents_indexed, 5);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let writer = Arc::new(ScriptedWriter::always_ok());
        let result = PipelineDriver::new(
            writer,
            PipelineConfig {
                max_concurrent_batches: 0,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }
}
