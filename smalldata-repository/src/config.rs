//! Configuration types for index writers.

use std::time::Duration;

/// Default per-request timeout for bulk calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(600);

/// Configuration shared by all index writers.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Index that receives every document.
    pub target_index_name: String,
    /// Logical document collection inside the index, sent as `_type`.
    /// Leave unset for typeless endpoints.
    pub content_type_name: Option<String>,
    /// Upper bound on a single bulk request.
    pub http_timeout: Duration,
    /// Ask the endpoint to refresh the index after each bulk write.
    pub refresh_on_write: bool,
}

impl WriterConfig {
    /// Create a config targeting the given index with default settings.
    pub fn new(target_index_name: impl Into<String>) -> Self {
        Self {
            target_index_name: target_index_name.into(),
            content_type_name: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            refresh_on_write: false,
        }
    }

    /// Set the content type written into every action line.
    pub fn with_content_type(mut self, content_type_name: impl Into<String>) -> Self {
        self.content_type_name = Some(content_type_name.into());
        self
    }

    /// Set the bulk request timeout.
    pub fn with_http_timeout(mut self, http_timeout: Duration) -> Self {
        self.http_timeout = http_timeout;
        self
    }

    /// Enable or disable refresh after each write.
    pub fn with_refresh_on_write(mut self, refresh_on_write: bool) -> Self {
        self.refresh_on_write = refresh_on_write;
        self
    }
}
