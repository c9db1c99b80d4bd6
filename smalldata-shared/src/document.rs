//! Output documents handed to the loader.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while building a [`Document`].
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The body could not be serialized or parsed as JSON.
    #[error("Invalid document JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The body is valid JSON but not an object.
    #[error("Document body must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// A single unit of output data ready to be indexed.
///
/// The body is kept in its compact serialized form so that the byte size
/// used for batching is exactly what goes on the wire. A document is
/// immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: String,
    source: String,
}

impl Document {
    /// Build a document from an already parsed JSON value.
    pub fn from_json(id: impl Into<String>, body: &Value) -> Result<Self, DocumentError> {
        if !body.is_object() {
            return Err(DocumentError::NotAnObject(json_kind(body)));
        }
        Ok(Self {
            id: id.into(),
            source: serde_json::to_string(body)?,
        })
    }

    /// Build a document from any serializable value that renders as a JSON object.
    pub fn from_serializable<T: Serialize>(
        id: impl Into<String>,
        body: &T,
    ) -> Result<Self, DocumentError> {
        let value = serde_json::to_value(body)?;
        Self::from_json(id, &value)
    }

    /// Build a document from raw JSON text, re-rendering it compactly.
    ///
    /// Compacting guarantees the source fits on one NDJSON line.
    pub fn from_raw(id: impl Into<String>, raw: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_json(id, &value)
    }

    /// Document identifier, used as the `_id` of the index action.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Compact JSON serialization of the body.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Serialized byte size of the body.
    pub fn size_bytes(&self) -> usize {
        self.source.len()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
