//! Retry module for the smalldata pipeline.
//!
//! Writes one sealed batch through the index writer, retrying transient
//! failures with a pluggable backoff.

mod backoff;
mod coordinator;

pub use backoff::BackoffStrategy;
pub(crate) use coordinator::wait_for_abort;
pub use coordinator::{RetryCoordinator, RetryPolicy};
