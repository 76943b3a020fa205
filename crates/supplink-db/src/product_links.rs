//! Database operations for `product_links`.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use supplink_core::ProductLink;

use crate::DbError;

/// A row from the `product_links` table. `links_json` holds the ordered
/// link list as a JSON array.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductLinksRow {
    pub item_key: String,
    pub display_name: String,
    pub links_json: Json<Vec<ProductLink>>,
    pub link_count: i32,
    pub updated_at: DateTime<Utc>,
}

/// Inserts or fully replaces the link set stored under `item_key`.
///
/// The caller is responsible for normalizing `item_key`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_product_links(
    pool: &PgPool,
    item_key: &str,
    display_name: &str,
    links: &[ProductLink],
) -> Result<(), DbError> {
    let link_count = i32::try_from(links.len()).unwrap_or(i32::MAX);

    sqlx::query(
        "INSERT INTO product_links (item_key, display_name, links_json, link_count, updated_at) \
         VALUES ($1, $2, $3, $4, NOW()) \
         ON CONFLICT (item_key) DO UPDATE SET \
             display_name = EXCLUDED.display_name, \
             links_json   = EXCLUDED.links_json, \
             link_count   = EXCLUDED.link_count, \
             updated_at   = NOW()",
    )
    .bind(item_key)
    .bind(display_name)
    .bind(Json(links))
    .bind(link_count)
    .execute(pool)
    .await?;

    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or the stored JSON no longer
/// decodes as a link list.
pub async fn get_product_links(
    pool: &PgPool,
    item_key: &str,
) -> Result<Option<ProductLinksRow>, DbError> {
    let row = sqlx::query_as::<_, ProductLinksRow>(
        "SELECT item_key, display_name, links_json, link_count, updated_at \
         FROM product_links \
         WHERE item_key = $1",
    )
    .bind(item_key)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Number of items with a stored link set.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_product_links(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM product_links")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
