//! Per-item link collection across the approved brand list.
//!
//! For every brand (catalog order) and every query variant (template order),
//! results are filtered by domain and relevance, priced, deduplicated by URL
//! and capped per brand and in total. Query and brand failures are logged
//! and skipped; only an empty final set fails the item.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use supplink_core::{AppConfig, Catalog, ProductLink, RelevanceRule};

use crate::client::SearchProvider;
use crate::domain::DomainFilter;
use crate::error::CollectError;
use crate::extract::{extract_price, extract_rating};
use crate::query::QueryBuilder;
use crate::relevance::is_relevant;
use crate::types::RawSearchResult;

/// Pacing and filtering knobs that do not change per call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectSettings {
    /// Courtesy delay between two queries for the same brand.
    pub inter_query_delay: Duration,
    /// Courtesy delay before starting the next brand.
    pub inter_brand_delay: Duration,
    pub relevance: RelevanceRule,
}

impl Default for CollectSettings {
    fn default() -> Self {
        Self {
            inter_query_delay: Duration::from_millis(100),
            inter_brand_delay: Duration::from_millis(300),
            relevance: RelevanceRule::Phrase,
        }
    }
}

impl CollectSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            inter_query_delay: Duration::from_millis(config.inter_query_delay_ms),
            inter_brand_delay: Duration::from_millis(config.inter_brand_delay_ms),
            relevance: config.relevance,
        }
    }
}

pub struct LinkCollector<S> {
    provider: S,
    filter: DomainFilter,
    queries: QueryBuilder,
    settings: CollectSettings,
}

impl<S: SearchProvider> LinkCollector<S> {
    pub fn new(
        provider: S,
        filter: DomainFilter,
        queries: QueryBuilder,
        settings: CollectSettings,
    ) -> Self {
        Self {
            provider,
            filter,
            queries,
            settings,
        }
    }

    /// Builds a collector over the catalog's brands and query templates.
    pub fn from_catalog(provider: S, catalog: &Catalog, settings: CollectSettings) -> Self {
        Self::new(
            provider,
            DomainFilter::new(catalog.brands.iter().cloned()),
            QueryBuilder::new(catalog.query_templates.iter().cloned()),
            settings,
        )
    }

    pub fn provider(&self) -> &S {
        &self.provider
    }

    /// Collects up to `total_cap` unique approved links for `item`, at most
    /// `per_brand_cap` of them from any one brand.
    ///
    /// Links are returned in discovery order. A brand is counted by the domain
    /// of each link, so a result for brand B surfaced by a query for brand A
    /// still counts toward B's cap.
    ///
    /// # Errors
    ///
    /// - [`CollectError::EmptyItem`] if `item` is blank (no queries are sent).
    /// - [`CollectError::NoLinks`] if nothing passed the filters.
    pub async fn collect(
        &self,
        item: &str,
        per_brand_cap: usize,
        total_cap: usize,
    ) -> Result<Vec<ProductLink>, CollectError> {
        let item = item.trim();
        if item.is_empty() {
            return Err(CollectError::EmptyItem);
        }

        let mut acc = Accumulator::new(per_brand_cap, total_cap);

        'brands: for (brand_idx, brand) in self.filter.brands().iter().enumerate() {
            if acc.is_full() {
                break;
            }
            if brand_idx > 0 {
                pause(self.settings.inter_brand_delay).await;
            }

            for (query_idx, query) in self.queries.build(&brand.name, item).iter().enumerate() {
                if acc.brand_full(&brand.domain) {
                    tracing::debug!(item, brand = %brand.name, "brand cap reached");
                    break;
                }
                if query_idx > 0 {
                    pause(self.settings.inter_query_delay).await;
                }

                let results = match self.provider.search(query).await {
                    Ok(results) => results,
                    Err(err) if err.is_transient() => {
                        tracing::warn!(
                            item,
                            brand = %brand.name,
                            query = %query,
                            error = %err,
                            "search failed after retries, skipping query"
                        );
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(
                            item,
                            brand = %brand.name,
                            query = %query,
                            error = %err,
                            "search rejected, skipping brand"
                        );
                        continue 'brands;
                    }
                };

                let added = self.absorb(item, &results, &mut acc);
                tracing::debug!(
                    item,
                    brand = %brand.name,
                    query = %query,
                    results = results.len(),
                    added,
                    "query processed"
                );

                if acc.is_full() {
                    break 'brands;
                }
            }
        }

        let links = acc.into_links();
        if links.is_empty() {
            tracing::info!(item, "no approved product links found");
            return Err(CollectError::NoLinks {
                item: item.to_owned(),
            });
        }
        tracing::info!(item, links = links.len(), "collected product links");
        Ok(links)
    }

    /// Feeds one page of results through the filters; returns how many links
    /// were added.
    fn absorb(&self, item: &str, results: &[RawSearchResult], acc: &mut Accumulator) -> usize {
        let mut added = 0;
        for raw in results {
            if acc.is_full() {
                break;
            }
            let url = raw.link().trim();
            if url.is_empty() {
                continue;
            }
            let Some(brand) = self.filter.lookup(url) else {
                continue;
            };
            if !is_relevant(self.settings.relevance, item, raw) {
                continue;
            }
            let link = ProductLink {
                url: url.to_owned(),
                price: extract_price(raw),
                rating: extract_rating(raw),
                brand: brand.name.clone(),
            };
            if acc.offer(&brand.domain, link) {
                added += 1;
            }
        }
        added
    }
}

/// Discovery-ordered links plus the bookkeeping needed to enforce caps.
struct Accumulator {
    links: Vec<ProductLink>,
    seen: HashSet<String>,
    /// Keyed by approved domain; display names need not be unique.
    per_brand: HashMap<String, usize>,
    per_brand_cap: usize,
    total_cap: usize,
}

impl Accumulator {
    fn new(per_brand_cap: usize, total_cap: usize) -> Self {
        Self {
            links: Vec::new(),
            seen: HashSet::new(),
            per_brand: HashMap::new(),
            per_brand_cap,
            total_cap,
        }
    }

    fn is_full(&self) -> bool {
        self.links.len() >= self.total_cap
    }

    fn brand_full(&self, domain: &str) -> bool {
        self.per_brand.get(domain).copied().unwrap_or(0) >= self.per_brand_cap
    }

    /// Adds `link` unless its URL was already seen or a cap is reached.
    fn offer(&mut self, domain: &str, link: ProductLink) -> bool {
        if self.is_full() || self.brand_full(domain) || self.seen.contains(&link.url) {
            return false;
        }
        self.seen.insert(link.url.clone());
        *self.per_brand.entry(domain.to_owned()).or_default() += 1;
        self.links.push(link);
        true
    }

    fn into_links(self) -> Vec<ProductLink> {
        self.links
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
#[path = "collector_test.rs"]
mod tests;
