//! # Smalldata Shared
//!
//! Data model shared by the repository, pipeline and loader crates:
//! documents, sealed batches, write attempts and the aggregate run report.

pub mod batch;
pub mod document;
pub mod report;
pub mod user_terms;

pub use batch::Batch;
pub use document::{Document, DocumentError};
pub use report::{
    AttemptOutcome, BatchReport, BatchResolution, ItemFailure, PipelineResult, WriteAttempt,
};
pub use user_terms::{TermScore, UserTermsDocument};
