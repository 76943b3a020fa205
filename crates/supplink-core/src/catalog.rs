//! The curated catalog: approved brand domains, the item list for batch
//! runs, and the query templates used to search for each brand + item pair.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Query templates tried for every brand, most specific first.
///
/// `{brand}` and `{item}` are substituted with the brand display name and
/// the item name.
pub const DEFAULT_QUERY_TEMPLATES: &[&str] = &[
    "\"{brand}\" {item}",
    "{brand} {item} supplement",
    "{brand} {item} capsules",
    "{brand} {item} tablets",
];

/// One approved vendor: the registered domain that identifies it and the
/// display name attached to every link found there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandEntry {
    pub domain: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    /// Order matters: brands are searched in the order listed.
    pub brands: Vec<BrandEntry>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default = "default_query_templates")]
    pub query_templates: Vec<String>,
}

fn default_query_templates() -> Vec<String> {
    DEFAULT_QUERY_TEMPLATES
        .iter()
        .map(|t| (*t).to_string())
        .collect()
}

/// Load and validate the catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<Catalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_catalog(&content)
}

/// Parse and validate catalog YAML that is already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML does not parse or fails validation.
pub fn parse_catalog(yaml: &str) -> Result<Catalog, ConfigError> {
    let catalog: Catalog = serde_yaml::from_str(yaml).map_err(ConfigError::CatalogFileParse)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &Catalog) -> Result<(), ConfigError> {
    if catalog.brands.is_empty() {
        return Err(ConfigError::Validation(
            "catalog must list at least one brand".to_string(),
        ));
    }

    let mut seen_domains = HashSet::new();
    for brand in &catalog.brands {
        if brand.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "brand for domain '{}' has an empty name",
                brand.domain
            )));
        }

        validate_domain(&brand.domain)?;

        if !seen_domains.insert(brand.domain.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate brand domain: '{}'",
                brand.domain
            )));
        }
    }

    let mut seen_items = HashSet::new();
    for item in &catalog.items {
        let key = item.trim().to_lowercase();
        if key.is_empty() {
            return Err(ConfigError::Validation(
                "item names must be non-empty".to_string(),
            ));
        }
        if !seen_items.insert(key) {
            return Err(ConfigError::Validation(format!("duplicate item: '{item}'")));
        }
    }

    if catalog.query_templates.is_empty() {
        return Err(ConfigError::Validation(
            "query_templates must not be empty".to_string(),
        ));
    }
    if let Some(bad) = catalog
        .query_templates
        .iter()
        .find(|t| !t.contains("{item}"))
    {
        return Err(ConfigError::Validation(format!(
            "query template '{bad}' does not reference {{item}}"
        )));
    }

    Ok(())
}

/// Domains are matched exactly against a URL host with `www.` removed, so
/// they must be stored in that same bare, lower-case form.
fn validate_domain(domain: &str) -> Result<(), ConfigError> {
    let reject = |reason: &str| {
        Err(ConfigError::Validation(format!(
            "invalid brand domain '{domain}': {reason}"
        )))
    };

    if domain.is_empty() {
        return reject("must be non-empty");
    }
    if domain.contains("://") || domain.contains('/') {
        return reject("must be a bare host, without scheme or path");
    }
    if domain.chars().any(char::is_whitespace) {
        return reject("must not contain whitespace");
    }
    if domain != domain.to_lowercase() {
        return reject("must be lower-case");
    }
    if domain.starts_with("www.") {
        return reject("drop the leading 'www.'; it is stripped before matching");
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return reject("must look like a registered domain, e.g. 'thorne.com'");
    }
    Ok(())
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
