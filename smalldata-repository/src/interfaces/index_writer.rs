//! Index writer trait definition.
//!
//! This module defines the abstract interface for writing sealed batches to a
//! search index, allowing different backends (OpenSearch, bulk file, mocks).

use async_trait::async_trait;

use crate::errors::IndexWriteError;
use smalldata_shared::Batch;

/// Acknowledgement of a successful bulk write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkAck {
    /// Number of entries the endpoint acknowledged.
    pub items: usize,
    /// Server-side processing time, when reported.
    pub took_ms: Option<u64>,
}

/// Abstracts the endpoint a batch is written to.
///
/// Implementations are stateless between calls and are shared across
/// concurrent dispatches, so they must be `Send + Sync`.
///
/// # Error Handling
///
/// Every failure is classified into an [`IndexWriteError`] variant; the
/// caller decides on retries from the variant alone.
#[async_trait]
pub trait IndexWriter: Send + Sync {
    /// Write one batch with a single bulk request.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkAck)` - If the endpoint acknowledged every entry
    /// * `Err(IndexWriteError::Transient)` - Network, timeout or overload
    /// * `Err(IndexWriteError::Fatal)` - Malformed data or protocol error
    /// * `Err(IndexWriteError::IndexMissing)` - The target index is absent
    async fn write(&self, batch: &Batch) -> Result<BulkAck, IndexWriteError>;

    /// Check whether the target index currently exists.
    async fn index_exists(&self) -> Result<bool, IndexWriteError>;

    /// Flush any buffered output once the run is over.
    async fn finish(&self) -> Result<(), IndexWriteError> {
        Ok(())
    }

    /// Human readable description of the write target, for logs.
    fn target(&self) -> String;
}
