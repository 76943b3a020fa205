//! HTTP client for the SerpApi shopping search endpoint.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use supplink_core::AppConfig;

use crate::error::SearchError;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::RawSearchResult;

/// Result arrays read from a response body, in order of preference.
const RESULT_KEYS: &[&str] = &["shopping_results", "organic_results"];

/// Provider message for a query that simply matched nothing.
const NO_RESULTS_MARKER: &str = "hasn't returned any results";

/// Longest provider error body kept in a [`SearchError::Rejected`] message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// The seam between link collection and the network.
///
/// Implementations own their retry behaviour: an `Err` returned here is the
/// final outcome for that query.
pub trait SearchProvider: Send + Sync {
    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<RawSearchResult>, SearchError>> + Send;
}

#[derive(Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Result-count hint sent as `num`.
    pub results_per_query: u32,
    pub retry: RetryPolicy,
}

impl ClientSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.search_base_url.clone(),
            api_key: config.serpapi_api_key.clone(),
            request_timeout: Duration::from_secs(config.search_request_timeout_secs),
            user_agent: config.search_user_agent.clone(),
            results_per_query: config.search_results_per_query,
            retry: RetryPolicy::from_config(config),
        }
    }
}

impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"[redacted]")
            .field("request_timeout", &self.request_timeout)
            .field("user_agent", &self.user_agent)
            .field("results_per_query", &self.results_per_query)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Production [`SearchProvider`] backed by SerpApi's Google Shopping engine.
///
/// 429 and 5xx responses, timeouts and connection failures are retried per
/// the configured [`RetryPolicy`]. Other 4xx responses and error payloads are
/// returned on the first attempt.
pub struct SerpApiClient {
    client: Client,
    base_url: Url,
    api_key: String,
    results_per_query: u32,
    retry: RetryPolicy,
}

impl SerpApiClient {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidBaseUrl`] if the base URL does not parse,
    /// or [`SearchError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(settings: ClientSettings) -> Result<Self, SearchError> {
        let base_url =
            Url::parse(&settings.base_url).map_err(|e| SearchError::InvalidBaseUrl {
                base_url: settings.base_url.clone(),
                reason: e.to_string(),
            })?;
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&settings.user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key: settings.api_key,
            results_per_query: settings.results_per_query,
            retry: settings.retry,
        })
    }

    /// # Errors
    ///
    /// See [`SerpApiClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, SearchError> {
        Self::new(ClientSettings::from_config(config))
    }

    /// Full request URL for `query`. Contains the API key; do not log it.
    fn request_url(&self, query: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("engine", "google")
            .append_pair("tbm", "shop")
            .append_pair("q", query)
            .append_pair("num", &self.results_per_query.to_string())
            .append_pair("api_key", &self.api_key);
        url
    }

    async fn search_once(&self, url: Url) -> Result<Vec<RawSearchResult>, SearchError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            return Err(SearchError::RateLimited { retry_after_secs });
        }

        if status.is_server_error() {
            return Err(SearchError::ServerError {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body = response.text().await?;
        parse_results(&body)
    }
}

impl SearchProvider for SerpApiClient {
    async fn search(&self, query: &str) -> Result<Vec<RawSearchResult>, SearchError> {
        let url = self.request_url(query);
        let results = retry_with_backoff(&self.retry, || self.search_once(url.clone())).await?;
        tracing::debug!(query, results = results.len(), "search completed");
        Ok(results)
    }
}

/// Decodes a 200 response body into result records.
///
/// A top-level `error` field is a provider error, except the "no results"
/// message, which is an empty result set.
fn parse_results(body: &str) -> Result<Vec<RawSearchResult>, SearchError> {
    let payload: Value = serde_json::from_str(body).map_err(|e| SearchError::Deserialize {
        context: "search response body".to_owned(),
        source: e,
    })?;

    if let Some(message) = payload.get("error").and_then(Value::as_str) {
        if message.contains(NO_RESULTS_MARKER) {
            return Ok(Vec::new());
        }
        return Err(SearchError::Api(message.to_owned()));
    }

    let results = RESULT_KEYS
        .iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_array))
        .find(|arr| !arr.is_empty())
        .map(|arr| {
            arr.iter()
                .cloned()
                .filter_map(RawSearchResult::from_value)
                .collect()
        })
        .unwrap_or_default();
    Ok(results)
}

/// Best human-readable message from an error response body.
fn error_message(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<Value>(body) {
        if let Some(message) = payload.get("error").and_then(Value::as_str) {
            return message.to_owned();
        }
    }
    body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
