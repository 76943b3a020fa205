//! Key-value storage of collected link sets.
//!
//! [`LinkStore`] is the seam used by the store writer. [`PgLinkStore`] is
//! backed by the `product_links` table; [`MemoryLinkStore`] keeps the same
//! replace-on-write semantics in process for dry runs and tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use supplink_core::ProductLink;

use crate::product_links::{get_product_links, upsert_product_links, ProductLinksRow};
use crate::DbError;

/// One stored link set as read back from a [`LinkStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLinks {
    pub item_key: String,
    pub display_name: String,
    pub links: Vec<ProductLink>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductLinksRow> for StoredLinks {
    fn from(row: ProductLinksRow) -> Self {
        Self {
            item_key: row.item_key,
            display_name: row.display_name,
            links: row.links_json.0,
            updated_at: row.updated_at,
        }
    }
}

pub trait LinkStore: Send + Sync {
    /// Replaces whatever is stored under `item_key` with `links`.
    fn upsert_links(
        &self,
        item_key: &str,
        display_name: &str,
        links: &[ProductLink],
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    fn get_links(
        &self,
        item_key: &str,
    ) -> impl Future<Output = Result<Option<StoredLinks>, DbError>> + Send;
}

#[derive(Debug, Clone)]
pub struct PgLinkStore {
    pool: PgPool,
}

impl PgLinkStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl LinkStore for PgLinkStore {
    async fn upsert_links(
        &self,
        item_key: &str,
        display_name: &str,
        links: &[ProductLink],
    ) -> Result<(), DbError> {
        upsert_product_links(&self.pool, item_key, display_name, links).await
    }

    async fn get_links(&self, item_key: &str) -> Result<Option<StoredLinks>, DbError> {
        Ok(get_product_links(&self.pool, item_key)
            .await?
            .map(StoredLinks::from))
    }
}

/// In-process store. Link lists are kept as JSON blobs, as in the
/// `product_links.links_json` column.
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    display_name: String,
    links_json: serde_json::Value,
    updated_at: DateTime<Utc>,
}

impl MemoryLinkStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl LinkStore for MemoryLinkStore {
    async fn upsert_links(
        &self,
        item_key: &str,
        display_name: &str,
        links: &[ProductLink],
    ) -> Result<(), DbError> {
        let entry = MemoryEntry {
            display_name: display_name.to_owned(),
            links_json: serde_json::to_value(links)?,
            updated_at: Utc::now(),
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item_key.to_owned(), entry);
        Ok(())
    }

    async fn get_links(&self, item_key: &str) -> Result<Option<StoredLinks>, DbError> {
        let entry = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(item_key)
            .cloned();
        let Some(entry) = entry else {
            return Ok(None);
        };
        Ok(Some(StoredLinks {
            item_key: item_key.to_owned(),
            display_name: entry.display_name,
            links: serde_json::from_value(entry.links_json)?,
            updated_at: entry.updated_at,
        }))
    }
}
