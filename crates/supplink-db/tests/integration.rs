//! Offline tests for supplink-db pool configuration and the in-memory store.
//! These tests do not require a live database connection.

use std::env::VarError;

use supplink_core::{build_app_config, ProductLink};
use supplink_db::{fetch, persist, CollectionRunRow, MemoryLinkStore, PoolConfig, StoreError};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = build_app_config(|key| match key {
        "SERPAPI_API_KEY" => Ok("test-key".to_string()),
        "SUPPLINK_DB_MAX_CONNECTIONS" => Ok("42".to_string()),
        "SUPPLINK_DB_MIN_CONNECTIONS" => Ok("7".to_string()),
        "SUPPLINK_DB_ACQUIRE_TIMEOUT_SECS" => Ok("9".to_string()),
        _ => Err(VarError::NotPresent),
    })
    .expect("config should build");

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout, std::time::Duration::from_secs(9));
}

/// Compile-time smoke test: confirm that [`CollectionRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn collection_run_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = CollectionRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        run_type: "links_batch".to_string(),
        trigger_source: "cli".to_string(),
        status: "queued".to_string(),
        started_at: None,
        completed_at: None,
        records_processed: 0_i32,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.run_type, "links_batch");
    assert_eq!(row.status, "queued");
    assert!(row.started_at.is_none());
    assert!(row.error_message.is_none());
}

#[tokio::test]
async fn memory_store_round_trip_through_writer() {
    let store = MemoryLinkStore::new();
    let links = vec![
        ProductLink {
            url: "https://www.thorne.com/products/magnesium-glycinate".to_string(),
            price: 18.0,
            rating: 0.0,
            brand: "Thorne".to_string(),
        },
        ProductLink {
            url: "https://www.nowfoods.com/products/magnesium-glycinate".to_string(),
            price: 0.0,
            rating: 4.6,
            brand: "NOW".to_string(),
        },
    ];

    let key = persist(&store, "Magnesium Glycinate", &links).await.unwrap();
    let stored = fetch(&store, &key).await.unwrap().expect("row should exist");

    assert_eq!(stored.item_key, "magnesium glycinate");
    assert_eq!(stored.links, links);
}

#[tokio::test]
async fn writer_rejects_empty_links_without_touching_store() {
    let store = MemoryLinkStore::new();
    let err = persist(&store, "Zinc", &[]).await.unwrap_err();
    assert!(matches!(err, StoreError::EmptyLinks { .. }));
    assert!(store.is_empty());
}
