//! Configuration and dependency wiring for the loader.

mod cli;
mod dependencies;

pub use cli::{
    BackoffKind, Cli, Commands, InFlightArg, InputFormatArg, LoaderSettings, LogFormat,
    DEFAULT_OPENSEARCH_URL,
};
pub use dependencies::{check_endpoint, Dependencies, EndpointStatus};

#[cfg(test)]
pub(crate) use cli::parse_without_env;
