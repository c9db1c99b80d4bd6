//! # Smalldata Loader
//!
//! Entry point and configuration for loading computed documents into a
//! search index.

pub mod config;

pub use config::{Cli, Commands, Dependencies, LoaderSettings, LogFormat};

use smalldata_pipeline::{PipelineError, SourceError};
use smalldata_repository::IndexWriteError;
pub use smalldata_shared::PipelineResult;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

/// Process exit status for a configuration, startup or run-level failure.
pub const EXIT_FAILURE: u8 = 1;

/// Process exit status when more documents failed than tolerated.
pub const EXIT_TOO_MANY_FAILURES: u8 = 2;

/// Errors that can occur during loader initialization or execution.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] PipelineError),

    /// Index writer error outside of a run.
    #[error("Writer error: {0}")]
    WriterError(#[from] IndexWriteError),

    /// Input could not be opened.
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    /// The process received an interrupt before a run started.
    #[error("Interrupted")]
    Interrupted,
}

impl LoaderError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

/// Execute the selected subcommand.
///
/// Returns the run report for `load` and `export`, `None` for `check`.
/// Raising `shutdown` during setup returns [`LoaderError::Interrupted`];
/// during a run it aborts the run, which still finishes the writer and
/// reports the partial result.
pub async fn run(
    cli: Cli,
    shutdown: watch::Receiver<bool>,
) -> Result<Option<PipelineResult>, LoaderError> {
    let settings = cli.settings;

    let mut interrupt = shutdown.clone();
    let prepared = tokio::select! {
        biased;
        Ok(_) = interrupt.wait_for(|raised| *raised) => return Err(LoaderError::Interrupted),
        prepared = prepare(cli.command, &settings) => prepared?,
    };
    let Some(mut deps) = prepared else {
        return Ok(None);
    };

    let result = deps.driver.run_until(&mut deps.source, shutdown).await?;
    Ok(Some(result))
}

/// Build the run for `load` and `export`; `check` completes here.
async fn prepare(
    command: Commands,
    settings: &LoaderSettings,
) -> Result<Option<Dependencies>, LoaderError> {
    let deps = match command {
        Commands::Load {
            input,
            recreate_index,
        } => Dependencies::for_load(settings, &input, recreate_index).await?,
        Commands::Export { input, output } => {
            Dependencies::for_export(settings, &input, &output).await?
        }
        Commands::Check => {
            let status = config::check_endpoint(settings).await?;
            info!(
                healthy = status.healthy,
                index_exists = status.index_exists,
                "Endpoint checked"
            );
            if !status.healthy {
                return Err(LoaderError::config("OpenSearch cluster is unhealthy"));
            }
            return Ok(None);
        }
    };
    Ok(Some(deps))
}

/// Map the outcome of [`run`] to a process exit status.
pub fn exit_code(
    outcome: &Result<Option<PipelineResult>, LoaderError>,
    max_failed_documents: u64,
) -> u8 {
    match outcome {
        Ok(Some(result)) if result.documents_failed > max_failed_documents => {
            warn!(
                documents_failed = result.documents_failed,
                max_failed_documents, "Too many failed documents"
            );
            EXIT_TOO_MANY_FAILURES
        }
        Ok(_) => 0,
        Err(_) => EXIT_FAILURE,
    }
}
