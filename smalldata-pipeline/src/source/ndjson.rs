use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};

use super::DocumentSource;
use crate::errors::SourceError;
use smalldata_shared::{Document, UserTermsDocument};

/// Default field holding the document identifier.
pub const DEFAULT_ID_FIELD: &str = "user_id";

/// Shape expected on every input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    /// Any JSON object, passed through as is.
    #[default]
    Json,
    /// Per-user term records. Lines missing a field or carrying a wrongly
    /// typed one are rejected, and the id is always `user_id`.
    UserTerms,
}

/// Reads one JSON object per line from a file.
///
/// Blank lines are skipped. The document id is taken from `id_field` when it
/// holds a string or number, and falls back to the 1-based line number.
pub struct NdjsonFileSource {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_number: u64,
    id_field: String,
    format: InputFormat,
}

impl NdjsonFileSource {
    /// Open the file for reading.
    pub async fn open(
        path: impl AsRef<Path>,
        id_field: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .await
            .map_err(|e| SourceError::read(format!("{}: {}", path.display(), e)))?;

        let id_field = id_field.into();
        info!(path = %path.display(), id_field = %id_field, "Opened document file");

        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            line_number: 0,
            id_field,
            format: InputFormat::Json,
        })
    }

    /// Set the expected line shape.
    pub fn with_format(mut self, format: InputFormat) -> Self {
        self.format = format;
        self
    }

    fn parse_line(&self, line: &str) -> Result<Document, SourceError> {
        match self.format {
            InputFormat::Json => {
                let body: Value = serde_json::from_str(line).map_err(|e| self.parse_error(e))?;
                let id = self.document_id(&body);
                Document::from_json(id, &body).map_err(|e| self.parse_error(e))
            }
            InputFormat::UserTerms => {
                let record: UserTermsDocument =
                    serde_json::from_str(line).map_err(|e| self.parse_error(e))?;
                Document::try_from(&record).map_err(|e| self.parse_error(e))
            }
        }
    }

    fn parse_error(&self, e: impl std::fmt::Display) -> SourceError {
        SourceError::parse(self.line_number, e.to_string())
    }

    fn document_id(&self, body: &Value) -> String {
        match body.get(&self.id_field) {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                debug!(line = self.line_number, "No usable id field, using line number");
                self.line_number.to_string()
            }
        }
    }
}

#[async_trait]
impl DocumentSource for NdjsonFileSource {
    async fn next_document(&mut self) -> Result<Option<Document>, SourceError> {
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| SourceError::read(format!("{}: {}", self.path.display(), e)))?;

            let Some(line) = line else {
                return Ok(None);
            };
            self.line_number += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return self.parse_line(trimmed).map(Some);
        }
    }
}
