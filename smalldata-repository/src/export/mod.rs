//! Bulk-file exporter.
//!
//! Writes the exact `_bulk` request body for every batch to a local file
//! instead of sending it, so the file can be posted later with
//! `curl --data-binary @file <url>/_bulk`.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::WriterConfig;
use crate::errors::IndexWriteError;
use crate::interfaces::{BulkAck, IndexWriter};
use crate::opensearch::render_bulk_lines;
use smalldata_shared::Batch;

/// Index writer that appends bulk NDJSON to a file.
///
/// Each batch is rendered in full and written under a lock, so lines from
/// concurrent dispatches never interleave. A batch that fails to write is
/// cut back out of the file.
pub struct NdjsonExportWriter {
    path: PathBuf,
    config: WriterConfig,
    out: Mutex<BulkFile>,
}

/// Output file plus the length covered by fully written batches.
struct BulkFile {
    file: File,
    committed: u64,
}

impl BulkFile {
    async fn append(&mut self, body: &[u8]) -> std::io::Result<()> {
        let written = match self.file.write_all(body).await {
            Ok(()) => self.file.flush().await,
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => {
                self.committed += body.len() as u64;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = self.rollback().await {
                    warn!(error = %rollback, "Failed to truncate partial batch");
                }
                Err(e)
            }
        }
    }

    /// Drop anything past the last fully written batch.
    async fn rollback(&mut self) -> std::io::Result<()> {
        self.file.set_len(self.committed).await?;
        self.file.seek(SeekFrom::Start(self.committed)).await?;
        Ok(())
    }
}

impl NdjsonExportWriter {
    /// Create (or truncate) the output file.
    pub async fn create(
        path: impl AsRef<Path>,
        config: WriterConfig,
    ) -> Result<Self, IndexWriteError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await.map_err(|e| {
            IndexWriteError::connection(format!("Creating {}: {}", path.display(), e))
        })?;

        info!(
            path = %path.display(),
            index = %config.target_index_name,
            "Created bulk file writer"
        );

        Ok(Self {
            path,
            config,
            out: Mutex::new(BulkFile { file, committed: 0 }),
        })
    }
}

#[async_trait]
impl IndexWriter for NdjsonExportWriter {
    async fn write(&self, batch: &Batch) -> Result<BulkAck, IndexWriteError> {
        let mut body = String::new();
        for line in render_bulk_lines(batch, &self.config) {
            body.push_str(&line);
            body.push('\n');
        }

        self.out
            .lock()
            .await
            .append(body.as_bytes())
            .await
            .map_err(|e| IndexWriteError::fatal(format!("Writing bulk file: {}", e)))?;

        debug!(batch_id = batch.id(), documents = batch.len(), "Exported batch");

        Ok(BulkAck {
            items: batch.len(),
            took_ms: None,
        })
    }

    async fn index_exists(&self) -> Result<bool, IndexWriteError> {
        Ok(true)
    }

    async fn finish(&self) -> Result<(), IndexWriteError> {
        let mut out = self.out.lock().await;
        out.file
            .flush()
            .await
            .map_err(|e| IndexWriteError::fatal(format!("Flushing bulk file: {}", e)))?;
        out.file
            .sync_all()
            .await
            .map_err(|e| IndexWriteError::fatal(format!("Syncing bulk file: {}", e)))
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }
}
