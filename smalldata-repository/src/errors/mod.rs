//! Error types for the smalldata repository.

mod index_write_error;

pub use index_write_error::IndexWriteError;
