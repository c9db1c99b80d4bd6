//! Interface definitions for index writers.
//!
//! This module defines the abstract `IndexWriter` trait that allows the
//! pipeline to be driven against swappable bulk-write backends.

mod index_writer;

pub use index_writer::{BulkAck, IndexWriter};
