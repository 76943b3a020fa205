use crate::app_config::{AppConfig, Environment, RelevanceRule};
use crate::ConfigError;

const DEFAULT_SEARCH_BASE_URL: &str = "https://serpapi.com/search.json";
const DEFAULT_USER_AGENT: &str = "supplink/0.1 (product-links)";

/// Reads `.env` (if present) into the process environment, then builds the
/// configuration from it.
///
/// # Errors
///
/// Returns `ConfigError` when `SERPAPI_API_KEY` is unset or a value fails to
/// parse.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Same as [`load_app_config`] without touching `.env`.
///
/// # Errors
///
/// See [`load_app_config`].
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Builds the configuration from `lookup`, which stands in for
/// `std::env::var`.
///
/// # Errors
///
/// Returns `ConfigError` when a required variable is blank or missing, or a
/// numeric or enumerated value is malformed.
#[allow(clippy::too_many_lines)]
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        match lookup(var) {
            Ok(value) if !value.trim().is_empty() => value,
            _ => default.to_string(),
        }
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let serpapi_api_key = require("SERPAPI_API_KEY")?;
    let database_url = lookup("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());

    let env = parse_environment(&or_default("SUPPLINK_ENV", "development"));
    let log_level = or_default("SUPPLINK_LOG_LEVEL", "info");
    let catalog_path = PathBuf::from(or_default(
        "SUPPLINK_CATALOG_PATH",
        "./config/catalog.yaml",
    ));

    let db_max_connections = parse_u32("SUPPLINK_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("SUPPLINK_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("SUPPLINK_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let search_base_url = or_default("SUPPLINK_SEARCH_BASE_URL", DEFAULT_SEARCH_BASE_URL);
    let search_request_timeout_secs = parse_u64("SUPPLINK_SEARCH_REQUEST_TIMEOUT_SECS", "30")?;
    let search_user_agent = or_default("SUPPLINK_SEARCH_USER_AGENT", DEFAULT_USER_AGENT);
    let search_results_per_query = parse_u32("SUPPLINK_SEARCH_RESULTS_PER_QUERY", "50")?;

    let search_max_attempts = parse_u32("SUPPLINK_SEARCH_MAX_ATTEMPTS", "3")?;
    if search_max_attempts == 0 {
        return Err(invalid(
            "SUPPLINK_SEARCH_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    let search_backoff_base_ms = parse_u64("SUPPLINK_SEARCH_BACKOFF_BASE_MS", "300")?;
    let search_backoff_factor = or_default("SUPPLINK_SEARCH_BACKOFF_FACTOR", "2")
        .parse::<f64>()
        .map_err(|e| invalid("SUPPLINK_SEARCH_BACKOFF_FACTOR", e.to_string()))?;
    if !search_backoff_factor.is_finite() || search_backoff_factor < 1.0 {
        return Err(invalid(
            "SUPPLINK_SEARCH_BACKOFF_FACTOR",
            format!("{search_backoff_factor} must be a finite number >= 1"),
        ));
    }

    let inter_query_delay_ms = parse_u64("SUPPLINK_INTER_QUERY_DELAY_MS", "100")?;
    let inter_brand_delay_ms = parse_u64("SUPPLINK_INTER_BRAND_DELAY_MS", "300")?;
    let inter_item_delay_ms = parse_u64("SUPPLINK_INTER_ITEM_DELAY_MS", "1000")?;

    let per_brand_cap = parse_positive_usize("SUPPLINK_PER_BRAND_CAP", "2")?;
    let total_cap = parse_positive_usize("SUPPLINK_TOTAL_CAP", "5")?;
    let batch_workers = parse_positive_usize("SUPPLINK_BATCH_WORKERS", "1")?;

    let relevance = or_default("SUPPLINK_RELEVANCE", "phrase")
        .parse::<RelevanceRule>()
        .map_err(|reason| invalid("SUPPLINK_RELEVANCE", reason))?;

    Ok(AppConfig {
        serpapi_api_key,
        database_url,
        env,
        log_level,
        catalog_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        search_base_url,
        search_request_timeout_secs,
        search_user_agent,
        search_results_per_query,
        search_max_attempts,
        search_backoff_base_ms,
        search_backoff_factor,
        inter_query_delay_ms,
        inter_brand_delay_ms,
        inter_item_delay_ms,
        per_brand_cap,
        total_cap,
        batch_workers,
        relevance,
    })
}

/// Anything unrecognized is treated as development.
fn parse_environment(raw: &str) -> Environment {
    match raw.trim().to_ascii_lowercase().as_str() {
        "production" | "prod" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
