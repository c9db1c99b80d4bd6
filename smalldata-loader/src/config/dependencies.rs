//! Dependency initialization and wiring for the loader.

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::LoaderSettings;
use crate::LoaderError;
use smalldata_pipeline::{NdjsonFileSource, PipelineDriver};
use smalldata_repository::{IndexWriter, NdjsonExportWriter, OpenSearchWriter};

/// Container for all initialized dependencies of one run.
pub struct Dependencies {
    /// The configured driver ready to run.
    pub driver: PipelineDriver,
    /// Input documents.
    pub source: NdjsonFileSource,
}

/// What `check` found at the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointStatus {
    pub healthy: bool,
    pub index_exists: bool,
}

impl Dependencies {
    /// Wire a run that bulk loads `input` into OpenSearch.
    ///
    /// The cluster must be reachable and healthy. With `recreate_index` the
    /// target index is deleted first, so the run starts from an empty index.
    pub async fn for_load(
        settings: &LoaderSettings,
        input: &Path,
        recreate_index: bool,
    ) -> Result<Self, LoaderError> {
        let writer = connect(settings).await?;

        if recreate_index {
            if !settings.index_auto_create {
                warn!("Recreating the index with auto-create disabled; the run will abort");
            }
            let deleted = writer.delete_index().await?;
            info!(deleted, "Target index cleared");
        }

        Self::wire(settings, input, Arc::new(writer)).await
    }

    /// Wire a run that writes bulk bodies for `input` to `output`.
    pub async fn for_export(
        settings: &LoaderSettings,
        input: &Path,
        output: &Path,
    ) -> Result<Self, LoaderError> {
        let writer = NdjsonExportWriter::create(output, settings.writer_config()?).await?;
        Self::wire(settings, input, Arc::new(writer)).await
    }

    async fn wire(
        settings: &LoaderSettings,
        input: &Path,
        writer: Arc<dyn IndexWriter>,
    ) -> Result<Self, LoaderError> {
        let driver = PipelineDriver::new(writer, settings.pipeline_config())?;
        let source = NdjsonFileSource::open(input, settings.document_id_field.clone())
            .await?
            .with_format(settings.input_format());

        Ok(Self { driver, source })
    }
}

/// Report endpoint health and whether the target index exists.
pub async fn check_endpoint(settings: &LoaderSettings) -> Result<EndpointStatus, LoaderError> {
    let writer = OpenSearchWriter::new(&settings.opensearch_url, settings.writer_config()?)?;

    let healthy = writer.health_check().await?;
    let index_exists = writer.index_exists().await?;

    Ok(EndpointStatus {
        healthy,
        index_exists,
    })
}

async fn connect(settings: &LoaderSettings) -> Result<OpenSearchWriter, LoaderError> {
    info!(
        opensearch_url = %settings.opensearch_url,
        "Initializing dependencies"
    );

    let writer = OpenSearchWriter::new(&settings.opensearch_url, settings.writer_config()?)
        .map_err(|e| LoaderError::config(format!("Failed to create OpenSearch client: {}", e)))?;

    // Verify OpenSearch is reachable
    let healthy = writer
        .health_check()
        .await
        .map_err(|e| LoaderError::config(format!("OpenSearch health check failed: {}", e)))?;

    if !healthy {
        return Err(LoaderError::config("OpenSearch cluster is unhealthy"));
    }

    info!("OpenSearch connection verified");
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_without_env;
    use std::io::Write;
    use tempfile::TempDir;

    fn settings(extra: &[&str]) -> LoaderSettings {
        let args = ["smalldata-loader", "check", "--target-index-name", "users"]
            .into_iter()
            .chain(extra.iter().copied());
        parse_without_env(args).unwrap().settings
    }

    #[tokio::test]
    async fn test_export_run_writes_bulk_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("users.ndjson");
        let output = dir.path().join("users.bulk");

        let mut file = std::fs::File::create(&input).unwrap();
        for id in 0..5 {
            writeln!(file, r#"{{"user_id": {}, "username": "u{}"}}"#, id, id).unwrap();
        }
        drop(file);

        let settings = settings(&["--max-batch-entries", "2"]);
        let mut deps = Dependencies::for_export(&settings, &input, &output)
            .await
            .unwrap();
        let result = deps.driver.run(&mut deps.source).await.unwrap();

        assert_eq!(result.documents_indexed, 5);
        assert_eq!(result.batches_dispatched, 3);

        let written = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 10);
        let action: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "users");
        assert_eq!(action["index"]["_id"], "0");
        assert_eq!(lines[1], r#"{"user_id":0,"username":"u0"}"#);
    }

    #[tokio::test]
    async fn test_export_run_with_user_terms() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("terms.ndjson");
        let output = dir.path().join("terms.bulk");
        std::fs::write(
            &input,
            concat!(
                r#"{"user_id": 7, "username": "alice", "num_comments": 3, "terms": []}"#,
                "\n",
                r#"{"user_id": 8, "username": "bob"}"#,
                "\n",
            ),
        )
        .unwrap();

        let settings = settings(&["--input-format", "user-terms"]);
        let mut deps = Dependencies::for_export(&settings, &input, &output)
            .await
            .unwrap();
        let err = deps.driver.run(&mut deps.source).await.unwrap_err();

        // The second record has no num_comments
        let result = err.partial_result().unwrap();
        assert_eq!(result.documents_submitted, 1);
        assert!(result.is_balanced());
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&[]);

        let result = Dependencies::for_export(
            &settings,
            &dir.path().join("missing.ndjson"),
            &dir.path().join("out.bulk"),
        )
        .await;

        assert!(matches!(result, Err(LoaderError::SourceError(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_config_error() {
        let settings = settings(&["--opensearch-url", "http://127.0.0.1:1"]);
        let dir = TempDir::new().unwrap();

        let result = Dependencies::for_load(&settings, &dir.path().join("in.ndjson"), false).await;

        assert!(matches!(result, Err(LoaderError::ConfigError(_))));
    }
}
