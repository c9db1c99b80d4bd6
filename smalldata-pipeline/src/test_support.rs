//! Scripted index writer shared by the pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use smalldata_repository::{BulkAck, IndexWriteError, IndexWriter};
use smalldata_shared::{Batch, Document};

type Script = Box<dyn Fn(&Batch, u32) -> Result<BulkAck, IndexWriteError> + Send + Sync>;

/// Writer whose outcome is decided per batch and per attempt by a closure.
///
/// Records how often each batch was written and flags any overlapping
/// writes of the same batch.
pub(crate) struct ScriptedWriter {
    script: Script,
    latency: Duration,
    index_exists: bool,
    calls: Mutex<HashMap<u64, u32>>,
    in_flight: Mutex<HashSet<u64>>,
    overlap_detected: AtomicBool,
    current: AtomicUsize,
    peak: AtomicUsize,
    finished: AtomicBool,
}

impl ScriptedWriter {
    pub(crate) fn new(
        script: impl Fn(&Batch, u32) -> Result<BulkAck, IndexWriteError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            latency: Duration::ZERO,
            index_exists: true,
            calls: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
            overlap_detected: AtomicBool::new(false),
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
        }
    }

    pub(crate) fn always_ok() -> Self {
        Self::new(|batch, _| Ok(ack(batch)))
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn with_index_exists(mut self, exists: bool) -> Self {
        self.index_exists = exists;
        self
    }

    pub(crate) fn calls_for(&self, batch_id: u64) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(&batch_id)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    pub(crate) fn overlap_detected(&self) -> bool {
        self.overlap_detected.load(Ordering::SeqCst)
    }

    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexWriter for ScriptedWriter {
    async fn write(&self, batch: &Batch) -> Result<BulkAck, IndexWriteError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(batch.id()).or_insert(0);
            *count += 1;
            *count
        };

        let first_writer = self.in_flight.lock().unwrap().insert(batch.id());
        if !first_writer {
            self.overlap_detected.store(true, Ordering::SeqCst);
        }
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.current.fetch_sub(1, Ordering::SeqCst);
        self.in_flight.lock().unwrap().remove(&batch.id());

        (self.script)(batch, attempt)
    }

    async fn index_exists(&self) -> Result<bool, IndexWriteError> {
        Ok(self.index_exists)
    }

    async fn finish(&self) -> Result<(), IndexWriteError> {
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn target(&self) -> String {
        "scripted".to_string()
    }
}

pub(crate) fn ack(batch: &Batch) -> BulkAck {
    BulkAck {
        items: batch.len(),
        took_ms: None,
    }
}

pub(crate) fn docs(count: usize) -> Vec<Document> {
    (0..count)
        .map(|i| Document::from_json(i.to_string(), &json!({ "user_id": i })).unwrap())
        .collect()
}
