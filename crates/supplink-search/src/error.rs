use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// `retry_after_secs` echoes the provider's `Retry-After` header for
    /// diagnostics only; backoff timing always follows the `RetryPolicy`.
    #[error("rate limited by search provider (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("search provider returned server error {status}")]
    ServerError { status: u16 },

    #[error("search request rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("search provider error: {0}")]
    Api(String),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid search base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

impl SearchError {
    /// Returns `true` if the failure is worth retrying after a back-off delay.
    ///
    /// Transient: HTTP 429, HTTP 5xx, and network-level timeouts or
    /// connection failures. Everything else (bad request, auth, provider
    /// error payloads, unparseable bodies) would fail the same way again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::RateLimited { .. } | SearchError::ServerError { .. } => true,
            SearchError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            SearchError::Rejected { .. }
            | SearchError::Api(_)
            | SearchError::Deserialize { .. }
            | SearchError::InvalidBaseUrl { .. } => false,
        }
    }
}

/// Terminal failures for a single item's collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("item name must be non-empty")]
    EmptyItem,

    #[error("no approved product links found for '{item}'")]
    NoLinks { item: String },
}
