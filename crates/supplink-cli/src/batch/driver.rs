use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use supplink_db::{persist, LinkStore};
use supplink_search::{CollectError, LinkCollector, SearchProvider};

use super::report::{write_checkpoint, BatchSummary, ItemOutcome, ItemReport};
use crate::Caps;

/// Everything the driver needs besides its collaborators.
#[derive(Debug, Clone)]
pub(crate) struct BatchPlan {
    pub items: Vec<String>,
    /// Index of the first item to process; earlier items are skipped.
    pub start: usize,
    pub workers: usize,
    pub caps: Caps,
    pub checkpoint_every: usize,
    /// Checkpoints are only written when set.
    pub output_dir: Option<PathBuf>,
    pub inter_item_delay: Duration,
}

/// Runs collect → persist for every item from `plan.start` on, with at most
/// `plan.workers` items in flight.
///
/// Item failures are recorded in the summary and never end the batch. When
/// `shutdown` resolves, in-flight items are dropped and the summary so far is
/// returned with `interrupted` set.
pub(crate) async fn drive_batch<P, S>(
    collector: &LinkCollector<P>,
    store: &S,
    plan: &BatchPlan,
    shutdown: impl Future<Output = ()>,
) -> BatchSummary
where
    P: SearchProvider,
    S: LinkStore,
{
    let total_items = plan.items.len();
    let start = plan.start.min(total_items);
    let workers = plan.workers.max(1);
    let checkpoint_every = plan.checkpoint_every.max(1);
    let mut summary = BatchSummary::new(start, total_items);

    tracing::info!(
        items = total_items - start,
        start,
        workers,
        "starting batch"
    );

    let outcomes = stream::iter(plan.items.iter().enumerate().skip(start))
        .map(|(index, item)| {
            // Each worker slot paces itself once it has already run an item.
            let delay = if index - start >= workers {
                plan.inter_item_delay
            } else {
                Duration::ZERO
            };
            process_item(collector, store, index, item, plan.caps, delay)
        })
        .buffer_unordered(workers);
    let mut outcomes = std::pin::pin!(outcomes);
    let mut shutdown = std::pin::pin!(shutdown);
    let mut last_checkpoint = 0;

    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => {
                tracing::warn!(
                    processed = summary.processed(),
                    next_index = summary.next_index(),
                    "batch interrupted; dropping in-flight items"
                );
                summary.interrupted = true;
                break;
            }
            next = outcomes.next() => {
                let Some(report) = next else { break };
                log_report(&report, summary.processed() + 1, total_items - start);
                summary.record(report);

                if summary.processed() % checkpoint_every == 0 {
                    checkpoint(plan, &summary).await;
                    last_checkpoint = summary.processed();
                }
            }
        }
    }

    if summary.interrupted || summary.processed() != last_checkpoint {
        checkpoint(plan, &summary).await;
    }
    summary
}

async fn process_item<P, S>(
    collector: &LinkCollector<P>,
    store: &S,
    index: usize,
    item: &str,
    caps: Caps,
    delay: Duration,
) -> ItemReport
where
    P: SearchProvider,
    S: LinkStore,
{
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let outcome = match collector.collect(item, caps.per_brand, caps.total).await {
        Ok(links) => match persist(store, item, &links).await {
            Ok(_) => ItemOutcome::Succeeded { links },
            Err(e) => ItemOutcome::Failed {
                error: e.to_string(),
            },
        },
        Err(CollectError::NoLinks { .. }) => ItemOutcome::NoLinks,
        Err(e) => ItemOutcome::Failed {
            error: e.to_string(),
        },
    };

    ItemReport {
        index,
        item: item.to_string(),
        outcome,
        finished_at: Utc::now(),
    }
}

fn log_report(report: &ItemReport, position: usize, of: usize) {
    match &report.outcome {
        ItemOutcome::Succeeded { links } => tracing::info!(
            item = %report.item,
            index = report.index,
            links = links.len(),
            "[{position}/{of}] collected"
        ),
        ItemOutcome::NoLinks => tracing::warn!(
            item = %report.item,
            index = report.index,
            "[{position}/{of}] no approved links"
        ),
        ItemOutcome::Failed { error } => tracing::error!(
            item = %report.item,
            index = report.index,
            error = %error,
            "[{position}/{of}] item failed"
        ),
    }
}

async fn checkpoint(plan: &BatchPlan, summary: &BatchSummary) {
    let Some(dir) = &plan.output_dir else {
        return;
    };
    match write_checkpoint(dir, summary).await {
        Ok(path) => tracing::info!(
            path = %path.display(),
            next_index = summary.next_index(),
            "checkpoint written"
        ),
        Err(e) => tracing::warn!(error = %e, dir = %dir.display(), "failed to write checkpoint"),
    }
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
