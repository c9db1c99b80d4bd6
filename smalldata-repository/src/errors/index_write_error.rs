//! Index write error types.
//!
//! This module defines the failure taxonomy for bulk writes. The variant, not
//! the message, decides whether a batch is retried.

use smalldata_shared::ItemFailure;
use thiserror::Error;

/// Errors that can occur while writing a batch to the index.
#[derive(Debug, Clone, Error)]
pub enum IndexWriteError {
    /// Network error, timeout or capacity response. Eligible for retry.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Malformed documents or an unrecoverable protocol response.
    /// The whole batch fails without retry.
    #[error("Fatal failure: {reason}")]
    Fatal {
        reason: String,
        items: Vec<ItemFailure>,
    },

    /// The target index does not exist and the endpoint will not create it.
    #[error("Target index not found: {0}")]
    IndexMissing(String),

    /// The writer could not be set up.
    #[error("Connection error: {0}")]
    Connection(String),
}

impl IndexWriteError {
    /// Create a transient error.
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create a fatal error with no per-item detail.
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal {
            reason: msg.into(),
            items: Vec::new(),
        }
    }

    /// Create a fatal error carrying the rejected items.
    pub fn fatal_items(msg: impl Into<String>, items: Vec<ItemFailure>) -> Self {
        Self::Fatal {
            reason: msg.into(),
            items,
        }
    }

    /// Create an index missing error.
    pub fn index_missing(index: impl Into<String>) -> Self {
        Self::IndexMissing(index.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Whether the batch may be written again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Whether the failure must stop the whole run rather than one batch.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::IndexMissing(_) | Self::Connection(_))
    }

    /// Per-document failures reported by the endpoint, if any.
    pub fn item_failures(&self) -> &[ItemFailure] {
        match self {
            Self::Fatal { items, .. } => items,
            _ => &[],
        }
    }
}
