//! Store writer: validates a collected link set and upserts it under the
//! item's canonical key.

use supplink_core::{normalize_item_key, ProductLink};
use thiserror::Error;

use crate::store::{LinkStore, StoredLinks};
use crate::DbError;

/// Caller-facing store failures.
///
/// Input problems are reported before the store is touched. A failed write is
/// [`StoreError::Write`], never a "not found".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item name must be non-empty")]
    EmptyItem,

    #[error("refusing to persist an empty link list for '{item}'")]
    EmptyLinks { item: String },

    #[error("link #{index} for '{item}' is invalid: {reason}")]
    InvalidLink {
        item: String,
        index: usize,
        reason: &'static str,
    },

    #[error("failed to write links for '{item_key}': {source}")]
    Write {
        item_key: String,
        #[source]
        source: DbError,
    },

    #[error("failed to read links for '{item_key}': {source}")]
    Read {
        item_key: String,
        #[source]
        source: DbError,
    },
}

/// Replaces the stored link set for `item` and returns the canonical key.
///
/// # Errors
///
/// - [`StoreError::EmptyItem`], [`StoreError::EmptyLinks`] or
///   [`StoreError::InvalidLink`] before any I/O.
/// - [`StoreError::Write`] if the store rejects the upsert.
pub async fn persist<S: LinkStore>(
    store: &S,
    item: &str,
    links: &[ProductLink],
) -> Result<String, StoreError> {
    let item_key = normalize_item_key(item).ok_or(StoreError::EmptyItem)?;
    let display_name = item.trim();
    if links.is_empty() {
        return Err(StoreError::EmptyLinks {
            item: display_name.to_owned(),
        });
    }
    if let Some((index, reason)) = links.iter().enumerate().find_map(|(i, l)| {
        invalid_reason(l).map(|reason| (i, reason))
    }) {
        return Err(StoreError::InvalidLink {
            item: display_name.to_owned(),
            index,
            reason,
        });
    }

    store
        .upsert_links(&item_key, display_name, links)
        .await
        .map_err(|source| StoreError::Write {
            item_key: item_key.clone(),
            source,
        })?;

    tracing::info!(item_key = %item_key, links = links.len(), "persisted product links");
    Ok(item_key)
}

/// Reads the stored link set for `item`, if any.
///
/// # Errors
///
/// - [`StoreError::EmptyItem`] if `item` is blank.
/// - [`StoreError::Read`] if the store query fails.
pub async fn fetch<S: LinkStore>(store: &S, item: &str) -> Result<Option<StoredLinks>, StoreError> {
    let item_key = normalize_item_key(item).ok_or(StoreError::EmptyItem)?;
    store
        .get_links(&item_key)
        .await
        .map_err(|source| StoreError::Read { item_key, source })
}

fn invalid_reason(link: &ProductLink) -> Option<&'static str> {
    if link.url.trim().is_empty() {
        return Some("url is empty");
    }
    if !link.price.is_finite() || link.price < 0.0 {
        return Some("price must be a finite, non-negative number");
    }
    if !link.rating.is_finite() || link.rating < 0.0 {
        return Some("rating must be a finite, non-negative number");
    }
    None
}
