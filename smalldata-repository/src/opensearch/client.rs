//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `IndexWriter`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesDeleteParts, IndicesExistsParts},
    params::Refresh,
    BulkParts, OpenSearch,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::config::WriterConfig;
use crate::errors::IndexWriteError;
use crate::interfaces::{BulkAck, IndexWriter};
use crate::opensearch::bulk::{classify_response, render_bulk_lines};
use smalldata_shared::Batch;

/// OpenSearch bulk writer.
///
/// Sends each batch as a single `_bulk` request against the configured index.
/// The underlying HTTP client is connection-pooled and safe to share across
/// concurrent dispatches.
///
/// # Example
///
/// ```ignore
/// use smalldata_repository::{OpenSearchWriter, WriterConfig};
/// let config = WriterConfig::new("smalldata-users").with_content_type("users");
/// let writer = OpenSearchWriter::new("http://localhost:9200", config)?;
/// let ack = writer.write(&batch).await?;
/// ```
pub struct OpenSearchWriter {
    client: OpenSearch,
    url: String,
    config: WriterConfig,
}

impl OpenSearchWriter {
    /// Create a new writer connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `config` - Target index, content type, timeout and refresh policy
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchWriter)` - A new writer instance
    /// * `Err(IndexWriteError::Connection)` - If the URL or transport is invalid
    pub fn new(url: &str, config: WriterConfig) -> Result<Self, IndexWriteError> {
        let parsed_url =
            Url::parse(url).map_err(|e| IndexWriteError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| IndexWriteError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            index = %config.target_index_name,
            timeout_secs = config.http_timeout.as_secs(),
            refresh = config.refresh_on_write,
            "Created OpenSearch writer"
        );

        Ok(Self {
            client,
            url: url.to_string(),
            config,
        })
    }

    /// The configuration this writer was built with.
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Delete the target index.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the index existed and was deleted
    /// * `Ok(false)` - If there was no index to delete
    /// * `Err(IndexWriteError)` - If the request failed
    #[instrument(skip(self), fields(index = %self.config.target_index_name))]
    pub async fn delete_index(&self) -> Result<bool, IndexWriteError> {
        let index = self.config.target_index_name.as_str();
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .request_timeout(self.config.http_timeout)
            .send()
            .await
            .map_err(|e| IndexWriteError::transient(format!("Delete index failed: {}", e)))?;

        let status = response.status_code();

        // 404 is acceptable - the index may never have been created
        if status.as_u16() == 404 {
            debug!("Index did not exist");
            return Ok(false);
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Delete index request failed");
            return Err(IndexWriteError::fatal(format!(
                "Delete index failed with status {}: {}",
                status, error_body
            )));
        }

        info!("Deleted index");
        Ok(true)
    }

    /// Check that the cluster is reachable and not red.
    pub async fn health_check(&self) -> Result<bool, IndexWriteError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .request_timeout(self.config.http_timeout)
            .send()
            .await
            .map_err(|e| IndexWriteError::transient(format!("Health check failed: {}", e)))?;

        if !response.status_code().is_success() {
            return Ok(false);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| IndexWriteError::transient(format!("Invalid health response: {}", e)))?;

        let cluster_status = body.get("status").and_then(Value::as_str).unwrap_or("red");
        debug!(cluster_status = %cluster_status, "Cluster health");
        Ok(cluster_status != "red")
    }
}

#[async_trait]
impl IndexWriter for OpenSearchWriter {
    #[instrument(
        skip(self, batch),
        fields(batch_id = batch.id(), documents = batch.len(), bytes = batch.total_bytes())
    )]
    async fn write(&self, batch: &Batch) -> Result<BulkAck, IndexWriteError> {
        let lines = render_bulk_lines(batch, &self.config);
        let refresh = if self.config.refresh_on_write {
            Refresh::True
        } else {
            Refresh::False
        };

        let response = self
            .client
            .bulk(BulkParts::Index(&self.config.target_index_name))
            .refresh(refresh)
            .request_timeout(self.config.http_timeout)
            .body(lines)
            .send()
            .await
            .map_err(|e| IndexWriteError::transient(format!("Bulk request failed: {}", e)))?;

        let status = response.status_code().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| IndexWriteError::transient(format!("Reading bulk response: {}", e)))?;

        let result = classify_response(status, &body, &self.config.target_index_name);
        if let Ok(ack) = &result {
            debug!(items = ack.items, took_ms = ?ack.took_ms, "Bulk write acknowledged");
        }
        result
    }

    async fn index_exists(&self) -> Result<bool, IndexWriteError> {
        let index = self.config.target_index_name.as_str();
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .request_timeout(self.config.http_timeout)
            .send()
            .await
            .map_err(|e| IndexWriteError::transient(format!("Index exists check failed: {}", e)))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(IndexWriteError::fatal(format!(
                "Index exists check returned status {}",
                status
            ))),
        }
    }

    fn target(&self) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), self.config.target_index_name)
    }
}
