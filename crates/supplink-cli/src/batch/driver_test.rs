use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::json;
use supplink_core::{BrandEntry, ProductLink, RelevanceRule};
use supplink_db::{DbError, MemoryLinkStore, StoredLinks};
use supplink_search::{
    CollectSettings, DomainFilter, QueryBuilder, RawSearchResult, SearchError,
};

use super::*;

/// Answers `"Thorne <item>"` with a fixed number of thorne.com results per
/// item. Items without an entry get nothing back.
#[derive(Default)]
struct FixedProvider {
    hits: HashMap<String, usize>,
    calls: Mutex<Vec<String>>,
}

impl FixedProvider {
    fn with(mut self, item: &str, links: usize) -> Self {
        self.hits.insert(format!("Thorne {item}"), links);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl SearchProvider for FixedProvider {
    async fn search(&self, query: &str) -> Result<Vec<RawSearchResult>, SearchError> {
        self.calls.lock().unwrap().push(query.to_owned());
        let count = self.hits.get(query).copied().unwrap_or(0);
        let slug = query.to_lowercase().replace(' ', "-");
        Ok((0..count)
            .map(|i| {
                RawSearchResult::from_value(json!({
                    "link": format!("https://www.thorne.com/products/{slug}-{i}"),
                    "title": query,
                    "extracted_price": 20.0,
                }))
                .unwrap()
            })
            .collect())
    }
}

/// Every write fails as if the pool were exhausted.
struct BrokenStore;

impl LinkStore for BrokenStore {
    async fn upsert_links(&self, _: &str, _: &str, _: &[ProductLink]) -> Result<(), DbError> {
        Err(DbError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    async fn get_links(&self, _: &str) -> Result<Option<StoredLinks>, DbError> {
        Err(DbError::Sqlx(sqlx::Error::PoolTimedOut))
    }
}

fn collector(provider: FixedProvider) -> LinkCollector<FixedProvider> {
    LinkCollector::new(
        provider,
        DomainFilter::new([BrandEntry {
            domain: "thorne.com".to_owned(),
            name: "Thorne".to_owned(),
        }]),
        QueryBuilder::new(vec!["{brand} {item}".to_owned()]),
        CollectSettings {
            inter_query_delay: Duration::ZERO,
            inter_brand_delay: Duration::ZERO,
            relevance: RelevanceRule::Phrase,
        },
    )
}

fn plan(items: &[&str]) -> BatchPlan {
    BatchPlan {
        items: items.iter().map(|s| (*s).to_owned()).collect(),
        start: 0,
        workers: 1,
        caps: Caps {
            per_brand: 3,
            total: 10,
        },
        checkpoint_every: 10,
        output_dir: None,
        inter_item_delay: Duration::ZERO,
    }
}

fn outcome_of<'a>(summary: &'a BatchSummary, item: &str) -> &'a ItemOutcome {
    &summary
        .reports
        .iter()
        .find(|r| r.item == item)
        .unwrap_or_else(|| panic!("no report for {item}"))
        .outcome
}

#[tokio::test]
async fn item_without_links_is_recorded_and_batch_continues() {
    let c = collector(
        FixedProvider::default()
            .with("Zinc Picolinate", 2)
            .with("Vitamin D3", 1),
    );
    let store = MemoryLinkStore::new();

    let summary = drive_batch(
        &c,
        &store,
        &plan(&["Zinc Picolinate", "Unobtainium", "Vitamin D3"]),
        std::future::pending(),
    )
    .await;

    assert_eq!(summary.processed(), 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total_links, 3);
    assert!(!summary.interrupted);
    assert!(matches!(
        outcome_of(&summary, "Unobtainium"),
        ItemOutcome::NoLinks
    ));
    assert_eq!(store.keys(), vec!["vitamin d3", "zinc picolinate"]);
}

#[tokio::test]
async fn caps_are_applied_per_item() {
    let c = collector(FixedProvider::default().with("Zinc Picolinate", 8));
    let store = MemoryLinkStore::new();

    let summary = drive_batch(&c, &store, &plan(&["Zinc Picolinate"]), std::future::pending()).await;

    let ItemOutcome::Succeeded { links } = outcome_of(&summary, "Zinc Picolinate") else {
        panic!("expected success");
    };
    assert_eq!(links.len(), 3);
    assert_eq!(summary.total_links, 3);
}

#[tokio::test]
async fn start_offset_skips_earlier_items() {
    let provider = FixedProvider::default()
        .with("A", 1)
        .with("B", 1)
        .with("C", 1)
        .with("D", 1);
    let c = collector(provider);
    let store = MemoryLinkStore::new();
    let mut plan = plan(&["A", "B", "C", "D"]);
    plan.start = 2;

    let summary = drive_batch(&c, &store, &plan, std::future::pending()).await;

    assert_eq!(summary.start, 2);
    assert_eq!(summary.processed(), 2);
    assert_eq!(summary.next_index(), 4);
    assert_eq!(c.provider().calls(), vec!["Thorne C", "Thorne D"]);
    assert_eq!(store.keys(), vec!["c", "d"]);
}

#[tokio::test]
async fn blank_item_and_store_failure_become_failed_outcomes() {
    let c = collector(FixedProvider::default().with("Zinc", 1));

    let summary = drive_batch(&c, &BrokenStore, &plan(&["Zinc", "   "]), std::future::pending()).await;

    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 2);
    let ItemOutcome::Failed { error } = outcome_of(&summary, "Zinc") else {
        panic!("store failure should fail the item");
    };
    assert!(error.contains("zinc"), "unexpected error text: {error}");
    assert!(matches!(
        outcome_of(&summary, "   "),
        ItemOutcome::Failed { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn workers_run_items_concurrently_and_pace_later_items() {
    let provider = FixedProvider::default()
        .with("A", 1)
        .with("B", 1)
        .with("C", 1)
        .with("D", 1);
    let c = collector(provider);
    let store = MemoryLinkStore::new();
    let mut plan = plan(&["A", "B", "C", "D"]);
    plan.workers = 3;
    plan.inter_item_delay = Duration::from_millis(1000);

    let started = tokio::time::Instant::now();
    let summary = drive_batch(&c, &store, &plan, std::future::pending()).await;

    // A, B and C start immediately; D waits one delay for a free slot.
    assert_eq!(started.elapsed(), Duration::from_millis(1000));
    assert_eq!(summary.succeeded, 4);
    assert_eq!(store.len(), 4);
    assert_eq!(summary.next_index(), 4);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_between_items_and_keeps_resume_offset() {
    let provider = FixedProvider::default()
        .with("A", 1)
        .with("B", 1)
        .with("C", 1);
    let c = collector(provider);
    let store = MemoryLinkStore::new();
    let mut plan = plan(&["A", "B", "C"]);
    plan.inter_item_delay = Duration::from_millis(1000);

    let summary = drive_batch(
        &c,
        &store,
        &plan,
        tokio::time::sleep(Duration::from_millis(1500)),
    )
    .await;

    assert!(summary.interrupted);
    assert_eq!(summary.processed(), 2);
    assert_eq!(summary.next_index(), 2);
    assert_eq!(store.keys(), vec!["a", "b"]);
}

#[tokio::test]
async fn checkpoint_file_records_progress() {
    let dir = tempfile::tempdir().unwrap();
    let c = collector(FixedProvider::default().with("A", 2).with("C", 1));
    let store = MemoryLinkStore::new();
    let mut plan = plan(&["A", "B", "C"]);
    plan.checkpoint_every = 2;
    plan.output_dir = Some(dir.path().join("progress"));

    drive_batch(&c, &store, &plan, std::future::pending()).await;

    let mut files: Vec<_> = std::fs::read_dir(dir.path().join("progress"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    files.sort();
    assert!(!files.is_empty());
    let name = files[files.len() - 1]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    assert!(name.starts_with("progress_") && name.ends_with(".json"), "{name}");

    let latest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&files[files.len() - 1]).unwrap()).unwrap();
    assert_eq!(latest["next_index"], 3);
    assert_eq!(latest["processed"], 3);
    assert_eq!(latest["succeeded"], 2);
    assert_eq!(latest["total_links"], 3);
    assert_eq!(latest["interrupted"], false);

    let results = latest["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["item"], "A");
    assert_eq!(results[0]["status"], "succeeded");
    assert_eq!(results[0]["links"].as_array().unwrap().len(), 2);
    assert_eq!(results[1]["status"], "no_links");
}

#[tokio::test]
async fn unwritable_checkpoint_dir_does_not_fail_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    let c = collector(FixedProvider::default().with("A", 1));
    let mut plan = plan(&["A"]);
    plan.output_dir = Some(blocker.join("progress"));

    let summary = drive_batch(&c, &MemoryLinkStore::new(), &plan, std::future::pending()).await;

    assert_eq!(summary.succeeded, 1);
}
