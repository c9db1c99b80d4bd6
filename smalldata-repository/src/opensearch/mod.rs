//! OpenSearch implementation of the index writer.
//!
//! This module provides a concrete `IndexWriter` that sends each batch as one
//! `_bulk` request, plus the NDJSON rendering and response classification
//! shared with the bulk-file exporter.

mod bulk;
mod client;

pub(crate) use bulk::render_bulk_lines;
pub use client::OpenSearchWriter;
