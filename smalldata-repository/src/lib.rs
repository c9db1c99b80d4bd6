//! # Smalldata Repository
//!
//! This crate provides the index writer abstraction used by the loading
//! pipeline, the error taxonomy for bulk writes, and two concrete writers:
//! an OpenSearch bulk client and a bulk-file exporter.

pub mod config;
pub mod errors;
pub mod export;
pub mod interfaces;
pub mod opensearch;

pub use config::WriterConfig;
pub use errors::IndexWriteError;
pub use export::NdjsonExportWriter;
pub use interfaces::{BulkAck, IndexWriter};
pub use opensearch::OpenSearchWriter;
