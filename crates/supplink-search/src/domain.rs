//! Approved-domain lookup for search result URLs.

use std::collections::HashMap;

use supplink_core::BrandEntry;

/// Returned by [`DomainFilter::brand_for`] when a URL is not on an approved domain.
pub const UNKNOWN_BRAND: &str = "Unknown";

/// Decides whether a URL belongs to an approved brand.
///
/// Matching is exact on the URL host after a single leading `www.` label is
/// removed: `www.thorne.com` matches `thorne.com`, but `shop.thorne.com` and
/// `thorne.com.example.net` do not. URLs that fail to parse, or that are not
/// `http`/`https`, are never approved.
#[derive(Debug, Clone)]
pub struct DomainFilter {
    brands: Vec<BrandEntry>,
    by_domain: HashMap<String, usize>,
}

impl DomainFilter {
    /// Builds a filter from brands in search order. If a domain is listed
    /// twice, the first entry wins.
    pub fn new(brands: impl IntoIterator<Item = BrandEntry>) -> Self {
        let mut entries = Vec::new();
        let mut by_domain = HashMap::new();
        for mut brand in brands {
            brand.domain = brand.domain.trim().to_ascii_lowercase();
            if by_domain.contains_key(&brand.domain) {
                tracing::warn!(domain = %brand.domain, "duplicate brand domain ignored");
                continue;
            }
            by_domain.insert(brand.domain.clone(), entries.len());
            entries.push(brand);
        }
        Self {
            brands: entries,
            by_domain,
        }
    }

    /// Brands in the order they should be searched.
    #[must_use]
    pub fn brands(&self) -> &[BrandEntry] {
        &self.brands
    }

    /// Returns the brand whose domain owns `url`, if any.
    #[must_use]
    pub fn lookup(&self, url: &str) -> Option<&BrandEntry> {
        let host = normalized_host(url)?;
        self.by_domain.get(&host).map(|&idx| &self.brands[idx])
    }

    #[must_use]
    pub fn is_approved(&self, url: &str) -> bool {
        self.lookup(url).is_some()
    }

    /// Brand display name for `url`, or [`UNKNOWN_BRAND`] when the domain
    /// is not approved. Callers that need a hard answer should check
    /// [`DomainFilter::is_approved`] first.
    #[must_use]
    pub fn brand_for(&self, url: &str) -> &str {
        self.lookup(url).map_or(UNKNOWN_BRAND, |b| b.name.as_str())
    }
}

/// Lower-cased host of an `http`/`https` URL with one leading `www.` removed.
fn normalized_host(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.trim_end_matches('.').to_ascii_lowercase();
    let host = host.strip_prefix("www.").map_or(host.clone(), str::to_owned);
    (!host.is_empty()).then_some(host)
}
