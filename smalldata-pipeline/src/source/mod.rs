//! Document sources for the smalldata pipeline.
//!
//! A source yields documents lazily and in order. It is finite and can only
//! be restarted by running it again from the beginning.

mod ndjson;

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::errors::SourceError;
use smalldata_shared::Document;

pub use ndjson::{InputFormat, NdjsonFileSource, DEFAULT_ID_FIELD};

/// Produces the documents to load.
#[async_trait]
pub trait DocumentSource: Send {
    /// Fetch the next document.
    ///
    /// Returns `Ok(None)` once the source is exhausted; that is the normal
    /// end of a run, not an error.
    async fn next_document(&mut self) -> Result<Option<Document>, SourceError>;
}

/// In-memory source over a list of documents.
#[derive(Debug, Default)]
pub struct VecSource {
    documents: VecDeque<Document>,
}

impl VecSource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: documents.into(),
        }
    }

    /// Documents not yet handed out.
    pub fn remaining(&self) -> usize {
        self.documents.len()
    }
}

impl From<Vec<Document>> for VecSource {
    fn from(documents: Vec<Document>) -> Self {
        Self::new(documents)
    }
}

#[async_trait]
impl DocumentSource for VecSource {
    async fn next_document(&mut self) -> Result<Option<Document>, SourceError> {
        Ok(self.documents.pop_front())
    }
}
