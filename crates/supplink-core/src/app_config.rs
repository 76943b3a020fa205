use std::path::PathBuf;
use std::str::FromStr;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How strictly a search result must mention the item to count as relevant.
///
/// `Phrase` is the default: the whole item name, case-insensitively, must
/// appear in the result's title or snippet.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RelevanceRule {
    #[default]
    Phrase,
    /// At least `min_ratio` of the item's alphanumeric tokens must appear
    /// somewhere in the title or snippet.
    Tokens { min_ratio: f64 },
    /// Accept every result from an approved domain.
    Off,
}

impl FromStr for RelevanceRule {
    type Err = String;

    /// Parses `phrase`, `off`, or `tokens:<ratio>` with a ratio in `(0, 1]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "phrase" => return Ok(Self::Phrase),
            "off" | "none" => return Ok(Self::Off),
            _ => {}
        }

        let Some(raw_ratio) = s.strip_prefix("tokens:") else {
            return Err(format!(
                "unknown relevance rule '{s}'; expected phrase, off, or tokens:<ratio>"
            ));
        };
        let min_ratio = raw_ratio
            .parse::<f64>()
            .map_err(|e| format!("invalid token ratio '{raw_ratio}': {e}"))?;
        if !(min_ratio > 0.0 && min_ratio <= 1.0) {
            return Err(format!("token ratio {min_ratio} must be in (0, 1]"));
        }
        Ok(Self::Tokens { min_ratio })
    }
}

impl std::fmt::Display for RelevanceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelevanceRule::Phrase => write!(f, "phrase"),
            RelevanceRule::Tokens { min_ratio } => write!(f, "tokens:{min_ratio}"),
            RelevanceRule::Off => write!(f, "off"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub serpapi_api_key: String,
    /// Only commands that read or write the store need this.
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub catalog_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub search_base_url: String,
    pub search_request_timeout_secs: u64,
    pub search_user_agent: String,
    pub search_results_per_query: u32,
    pub search_max_attempts: u32,
    pub search_backoff_base_ms: u64,
    pub search_backoff_factor: f64,
    pub inter_query_delay_ms: u64,
    pub inter_brand_delay_ms: u64,
    pub inter_item_delay_ms: u64,
    pub per_brand_cap: usize,
    pub total_cap: usize,
    pub batch_workers: usize,
    pub relevance: RelevanceRule,
}

impl AppConfig {
    /// Returns the database URL or the error a store-backed command should
    /// fail with before doing any work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `DATABASE_URL` was not set.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("serpapi_api_key", &"[redacted]")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("catalog_path", &self.catalog_path)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("search_base_url", &self.search_base_url)
            .field(
                "search_request_timeout_secs",
                &self.search_request_timeout_secs,
            )
            .field("search_user_agent", &self.search_user_agent)
            .field("search_results_per_query", &self.search_results_per_query)
            .field("search_max_attempts", &self.search_max_attempts)
            .field("search_backoff_base_ms", &self.search_backoff_base_ms)
            .field("search_backoff_factor", &self.search_backoff_factor)
            .field("inter_query_delay_ms", &self.inter_query_delay_ms)
            .field("inter_brand_delay_ms", &self.inter_brand_delay_ms)
            .field("inter_item_delay_ms", &self.inter_item_delay_ms)
            .field("per_brand_cap", &self.per_brand_cap)
            .field("total_cap", &self.total_cap)
            .field("batch_workers", &self.batch_workers)
            .field("relevance", &self.relevance)
            .finish()
    }
}
