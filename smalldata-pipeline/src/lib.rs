//! # Smalldata Pipeline
//!
//! This crate provides the pipeline that loads computed documents into a
//! search index.
//!
//! ## Architecture
//!
//! The pipeline follows a Source-Batcher-Dispatcher pattern:
//!
//! 1. **Source**: Yields documents lazily, in order
//! 2. **Batcher**: Seals documents into batches bounded by count and bytes
//! 3. **Retry**: Writes one batch through an `IndexWriter` with bounded retries
//! 4. **Orchestrator**: Drives the flow and aggregates the run report

pub mod batcher;
pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod retry;
pub mod source;

#[cfg(test)]
mod test_support;

pub use batcher::{AddOutcome, Batcher};
pub use config::{InFlightPolicy, PipelineConfig};
pub use errors::{PipelineError, SourceError};
pub use orchestrator::PipelineDriver;
pub use retry::{BackoffStrategy, RetryCoordinator, RetryPolicy};
pub use source::{DocumentSource, InputFormat, NdjsonFileSource, VecSource};
