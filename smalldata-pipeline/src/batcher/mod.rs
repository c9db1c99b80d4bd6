//! Batcher for the smalldata pipeline.
//!
//! Groups documents into batches bounded by entry count and byte size.

use tracing::trace;

use crate::config::PipelineConfig;
use smalldata_shared::{Batch, Document};

/// Result of adding one document to the batcher.
#[derive(Debug)]
#[must_use]
pub enum AddOutcome {
    /// The document joined the open batch.
    Accepted,
    /// The open batch was sealed to make room; the new document opened the next one.
    BatchReady(Batch),
}

/// Accumulates documents into bounded batches, preserving source order.
///
/// A batch is sealed when the next document would push it past either
/// limit. A document that alone exceeds `max_bytes` still gets a batch of its
/// own, because an empty open batch always accepts.
#[derive(Debug)]
pub struct Batcher {
    max_entries: usize,
    max_bytes: usize,
    open: Vec<Document>,
    open_bytes: usize,
    next_id: u64,
}

impl Batcher {
    /// Create a batcher with the given limits.
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            max_bytes,
            open: Vec::new(),
            open_bytes: 0,
            next_id: 0,
        }
    }

    /// Create a batcher from the pipeline limits.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.max_batch_entries, config.max_batch_bytes)
    }

    /// Add a document, sealing the open batch first if the document does not fit.
    pub fn add(&mut self, document: Document) -> AddOutcome {
        let size = document.size_bytes();
        let would_overflow = !self.open.is_empty()
            && (self.open.len() >= self.max_entries
                || self.open_bytes.saturating_add(size) > self.max_bytes);

        let sealed = if would_overflow { self.seal() } else { None };

        self.open_bytes = self.open_bytes.saturating_add(size);
        self.open.push(document);

        match sealed {
            Some(batch) => AddOutcome::BatchReady(batch),
            None => AddOutcome::Accepted,
        }
    }

    /// Seal and return the open batch, if it holds anything.
    pub fn flush(&mut self) -> Option<Batch> {
        self.seal()
    }

    /// Number of documents in the open batch.
    pub fn pending(&self) -> usize {
        self.open.len()
    }

    fn seal(&mut self) -> Option<Batch> {
        if self.open.is_empty() {
            return None;
        }

        let documents = std::mem::take(&mut self.open);
        self.open_bytes = 0;

        let batch = Batch::seal(self.next_id, documents);
        self.next_id += 1;

        trace!(
            batch_id = batch.id(),
            documents = batch.len(),
            bytes = batch.total_bytes(),
            "Batch sealed"
        );
        Some(batch)
    }
}
