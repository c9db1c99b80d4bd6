//! Command line and environment configuration.
//!
//! Every option can be given as a flag or through the environment (a `.env`
//! file is loaded first). Flags win over the environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::LoaderError;
use smalldata_pipeline::{BackoffStrategy, InFlightPolicy, InputFormat, PipelineConfig};
use smalldata_repository::WriterConfig;

/// Default OpenSearch URL.
pub const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

#[derive(Parser, Debug)]
#[command(name = "smalldata-loader")]
#[command(about = "Bulk load computed documents into a search index", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub settings: LoaderSettings,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Load an NDJSON document file into the target index
    Load {
        /// One JSON document per line
        #[arg(long, env = "INPUT_FILE")]
        input: PathBuf,

        /// Delete the target index before loading
        #[arg(long)]
        recreate_index: bool,
    },
    /// Write the bulk request bodies to a file instead of sending them
    Export {
        #[arg(long, env = "INPUT_FILE")]
        input: PathBuf,

        /// Destination of the bulk NDJSON
        #[arg(long)]
        output: PathBuf,
    },
    /// Verify the endpoint is reachable and report whether the index exists
    Check,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackoffKind {
    Fixed,
    Exponential,
    None,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InFlightArg {
    Finish,
    Abandon,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormatArg {
    /// Any JSON object per line
    Json,
    /// Typed per-user term records, keyed by `user_id`
    UserTerms,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct LoaderSettings {
    /// OpenSearch URL
    #[arg(long, env = "OPENSEARCH_URL", default_value = DEFAULT_OPENSEARCH_URL, global = true)]
    pub opensearch_url: String,

    /// Index receiving the documents
    #[arg(long, env = "TARGET_INDEX_NAME", global = true)]
    pub target_index_name: Option<String>,

    /// Document type sent as `_type`; omit for typeless endpoints
    #[arg(long, env = "CONTENT_TYPE_NAME", global = true)]
    pub content_type_name: Option<String>,

    /// Field holding the document id in the input file
    #[arg(long, env = "DOCUMENT_ID_FIELD", default_value = "user_id", global = true)]
    pub document_id_field: String,

    #[arg(long, env = "INPUT_FORMAT", value_enum, default_value_t = InputFormatArg::Json, global = true)]
    pub input_format: InputFormatArg,

    #[arg(long, env = "MAX_BATCH_ENTRIES", default_value_t = 100_000, global = true)]
    pub max_batch_entries: usize,

    #[arg(long, env = "MAX_BATCH_BYTES", default_value_t = 300_000_000, global = true)]
    pub max_batch_bytes: usize,

    /// Write calls per batch, first attempt included
    #[arg(long, env = "MAX_RETRY_ATTEMPTS", default_value_t = 100, global = true)]
    pub max_retry_attempts: u32,

    /// Delay between attempts; the cap when the backoff is exponential
    #[arg(long, env = "RETRY_WAIT_SECONDS", default_value_t = 600, global = true)]
    pub retry_wait_seconds: u64,

    #[arg(long, env = "RETRY_BACKOFF", value_enum, default_value_t = BackoffKind::Fixed, global = true)]
    pub retry_backoff: BackoffKind,

    /// Timeout of a single bulk request
    #[arg(long, env = "HTTP_TIMEOUT_SECONDS", default_value_t = 600, global = true)]
    pub http_timeout_seconds: u64,

    #[arg(long, env = "INDEX_AUTO_CREATE", default_value_t = true, action = ArgAction::Set, global = true)]
    pub index_auto_create: bool,

    #[arg(long, env = "INDEX_REFRESH_ON_WRITE", default_value_t = false, action = ArgAction::Set, global = true)]
    pub index_refresh_on_write: bool,

    #[arg(long, env = "MAX_CONCURRENT_BATCHES", default_value_t = 2, global = true)]
    pub max_concurrent_batches: usize,

    #[arg(long, env = "ABORT_ON_BATCH_FATAL", default_value_t = false, action = ArgAction::Set, global = true)]
    pub abort_on_batch_fatal: bool,

    #[arg(long, env = "IN_FLIGHT_ON_ABORT", value_enum, default_value_t = InFlightArg::Finish, global = true)]
    pub in_flight_on_abort: InFlightArg,

    /// Permanently failed documents tolerated before exiting with status 2
    #[arg(long, env = "MAX_FAILED_DOCUMENTS", default_value_t = 0, global = true)]
    pub max_failed_documents: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

impl LoaderSettings {
    pub fn pipeline_config(&self) -> PipelineConfig {
        let retry_wait = Duration::from_secs(self.retry_wait_seconds);
        let backoff = match self.retry_backoff {
            BackoffKind::Fixed => BackoffStrategy::Fixed(retry_wait),
            BackoffKind::Exponential => BackoffStrategy::Exponential {
                initial: Duration::from_secs(1).min(retry_wait),
                max: retry_wait,
            },
            BackoffKind::None => BackoffStrategy::None,
        };
        let in_flight_on_abort = match self.in_flight_on_abort {
            InFlightArg::Finish => InFlightPolicy::Finish,
            InFlightArg::Abandon => InFlightPolicy::Abandon,
        };

        PipelineConfig {
            max_batch_entries: self.max_batch_entries,
            max_batch_bytes: self.max_batch_bytes,
            max_retry_attempts: self.max_retry_attempts,
            backoff,
            index_auto_create: self.index_auto_create,
            max_concurrent_batches: self.max_concurrent_batches,
            abort_on_batch_fatal: self.abort_on_batch_fatal,
            in_flight_on_abort,
        }
    }

    pub fn input_format(&self) -> InputFormat {
        match self.input_format {
            InputFormatArg::Json => InputFormat::Json,
            InputFormatArg::UserTerms => InputFormat::UserTerms,
        }
    }

    pub fn writer_config(&self) -> Result<WriterConfig, LoaderError> {
        let index = self
            .target_index_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                LoaderError::config("TARGET_INDEX_NAME (or --target-index-name) is required")
            })?;

        let mut config = WriterConfig::new(index)
            .with_http_timeout(Duration::from_secs(self.http_timeout_seconds))
            .with_refresh_on_write(self.index_refresh_on_write);
        if let Some(content_type) = &self.content_type_name {
            config = config.with_content_type(content_type.clone());
        }
        Ok(config)
    }
}

/// Parse `args` as if no option were set in the environment.
#[cfg(test)]
pub(crate) fn parse_without_env<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    use clap::{Arg, CommandFactory, FromArgMatches};

    let no_env = |arg: Arg| arg.env(None::<&'static str>);
    let command = Cli::command()
        .mut_args(no_env)
        .mut_subcommand("load", |sub| sub.mut_args(no_env))
        .mut_subcommand("export", |sub| sub.mut_args(no_env));
    let matches = command.try_get_matches_from(args)?;
    Cli::from_arg_matches(&matches)
}
