//! Error types for the smalldata pipeline.

use smalldata_repository::IndexWriteError;
use smalldata_shared::PipelineResult;
use thiserror::Error;

/// Errors raised by a document source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The underlying input could not be opened or read.
    #[error("Read error: {0}")]
    ReadError(String),

    /// A record could not be turned into a document.
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: u64, message: String },
}

impl SourceError {
    /// Create a read error.
    pub fn read(msg: impl Into<String>) -> Self {
        Self::ReadError(msg.into())
    }

    /// Create a parse error for the given 1-based line.
    pub fn parse(line: u64, msg: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: msg.into(),
        }
    }
}

/// Errors that can occur in the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from the document source outside of a run.
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    /// Error from the index writer outside of batch dispatch.
    #[error("Writer error: {0}")]
    WriterError(#[from] IndexWriteError),

    /// The run stopped early. Carries the counters accumulated so far.
    #[error("Run aborted: {reason}")]
    RunAborted {
        reason: String,
        result: Box<PipelineResult>,
    },
}

impl PipelineError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a run aborted error.
    pub fn aborted(reason: impl Into<String>, result: PipelineResult) -> Self {
        Self::RunAborted {
            reason: reason.into(),
            result: Box::new(result),
        }
    }

    /// Partial counters of an aborted run.
    pub fn partial_result(&self) -> Option<&PipelineResult> {
        match self {
            Self::RunAborted { result, .. } => Some(result),
            _ => None,
        }
    }
}
