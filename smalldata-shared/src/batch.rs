//! Sealed batches of documents.

use crate::document::Document;

/// An ordered, sealed group of documents dispatched as one bulk write.
///
/// Batches are only constructed by sealing; afterwards the contents are
/// read-only and the batch is retried, if at all, as a whole.
#[derive(Debug, Clone)]
pub struct Batch {
    id: u64,
    documents: Vec<Document>,
    total_bytes: usize,
}

impl Batch {
    /// Seal a list of documents into a batch with the given sequence number.
    pub fn seal(id: u64, documents: Vec<Document>) -> Self {
        let total_bytes = documents.iter().map(Document::size_bytes).sum();
        Self {
            id,
            documents,
            total_bytes,
        }
    }

    /// Sequence number assigned in sealing order.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Documents in source order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Number of documents in the batch.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the batch holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Cumulative serialized size of all document bodies.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }
}
