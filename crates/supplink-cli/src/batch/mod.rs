//! `supplink batch`: collect and store links for many items, with resume
//! support and progress checkpoints.

mod driver;
mod report;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use supplink_core::AppConfig;
use supplink_db::{MemoryLinkStore, PgLinkStore};

use self::driver::{drive_batch, BatchPlan};
use self::report::{render_summary, render_tsv, BatchSummary};
use crate::{parse_positive, Caps};

const RUN_TYPE: &str = "links_batch";

#[derive(Debug, Args)]
pub(crate) struct BatchArgs {
    /// Item to process (repeatable); defaults to every item in the catalog
    #[arg(long = "item")]
    pub items: Vec<String>,

    /// Index of the first item to process, for resuming an interrupted batch
    #[arg(long, default_value_t = 0)]
    pub start: usize,

    /// Items processed concurrently (defaults to SUPPLINK_BATCH_WORKERS)
    #[arg(long, value_parser = parse_positive)]
    pub workers: Option<usize>,

    #[arg(long, value_parser = parse_positive)]
    pub per_brand_cap: Option<usize>,

    #[arg(long, value_parser = parse_positive)]
    pub total_cap: Option<usize>,

    /// Write a progress checkpoint after this many completed items
    #[arg(long, default_value_t = 10, value_parser = parse_positive)]
    pub checkpoint_every: usize,

    /// Directory for progress checkpoint files
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Also export every collected link as tab-separated lines
    #[arg(long)]
    pub tsv: Option<PathBuf>,

    /// Collect but do not write to the database
    #[arg(long)]
    pub dry_run: bool,
}

pub(crate) async fn run_batch(config: &AppConfig, args: BatchArgs) -> anyhow::Result<()> {
    let catalog = crate::load_catalog(config)?;
    let items = if args.items.is_empty() {
        catalog.items.clone()
    } else {
        args.items
    };
    if items.is_empty() {
        anyhow::bail!(
            "no items to process: {} lists none and no --item was given",
            config.catalog_path.display()
        );
    }
    if args.start >= items.len() {
        anyhow::bail!(
            "--start {} is past the last item (there are {})",
            args.start,
            items.len()
        );
    }

    let plan = BatchPlan {
        items,
        start: args.start,
        workers: args.workers.unwrap_or(config.batch_workers),
        caps: Caps::resolve(config, args.per_brand_cap, args.total_cap),
        checkpoint_every: args.checkpoint_every,
        output_dir: Some(args.output_dir),
        inter_item_delay: Duration::from_millis(config.inter_item_delay_ms),
    };
    let collector = crate::build_collector(config, &catalog)?;

    if args.dry_run {
        let store = MemoryLinkStore::new();
        let summary = drive_batch(&collector, &store, &plan, shutdown_signal()).await;
        report_results(&summary, args.tsv.as_deref()).await;
        println!("dry-run: {} item(s) validated, nothing written", store.len());
        return Ok(());
    }

    let pool = crate::connect_pool(config).await?;
    let run = supplink_db::create_collection_run(&pool, RUN_TYPE, "cli").await?;
    if let Err(e) = supplink_db::start_collection_run(&pool, run.id).await {
        crate::fail_run_best_effort(&pool, run.id, RUN_TYPE, format!("{e:#}")).await;
        return Err(e.into());
    }

    let store = PgLinkStore::new(pool.clone());
    let summary = drive_batch(&collector, &store, &plan, shutdown_signal()).await;
    report_results(&summary, args.tsv.as_deref()).await;

    if summary.interrupted {
        let message = format!(
            "interrupted after {} item(s); resume with --start {}",
            summary.processed(),
            summary.next_index()
        );
        crate::fail_run_best_effort(&pool, run.id, RUN_TYPE, message).await;
        return Ok(());
    }
    if summary.succeeded == 0 {
        let message = format!("all {} item(s) failed", summary.failed);
        tracing::warn!(run_id = run.id, "{message}");
        crate::fail_run_best_effort(&pool, run.id, RUN_TYPE, message).await;
        return Ok(());
    }

    let records = i32::try_from(summary.total_links).unwrap_or(i32::MAX);
    if let Err(err) = supplink_db::complete_collection_run(&pool, run.id, records).await {
        crate::fail_run_best_effort(&pool, run.id, RUN_TYPE, format!("{err:#}")).await;
        return Err(err.into());
    }
    tracing::info!(run_id = run.id, records, "batch run recorded");
    Ok(())
}

/// Prints the summary, then writes the TSV export if one was requested. The
/// links are already stored by now, so a failed export is only logged.
async fn report_results(summary: &BatchSummary, tsv: Option<&Path>) {
    println!("{}", render_summary(summary));
    let Some(path) = tsv else {
        return;
    };
    match export_tsv(path, summary).await {
        Ok(()) => println!("wrote {} link(s) to {}", summary.total_links, path.display()),
        Err(e) => tracing::warn!(error = %format!("{e:#}"), "TSV export skipped"),
    }
}

async fn export_tsv(path: &Path, summary: &BatchSummary) -> anyhow::Result<()> {
    tokio::fs::write(path, render_tsv(summary))
        .await
        .with_context(|| format!("writing {}", path.display()))
}

/// Resolves on Ctrl-C. If the handler cannot be installed the batch simply
/// runs to completion.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::report::{ItemOutcome, ItemReport};
    use super::*;

    fn summary_with_one_link() -> BatchSummary {
        let mut summary = BatchSummary::new(0, 1);
        summary.record(ItemReport {
            index: 0,
            item: "Zinc".to_owned(),
            outcome: ItemOutcome::Succeeded {
                links: vec![supplink_core::ProductLink {
                    url: "https://thorne.com/zinc".to_owned(),
                    price: 12.5,
                    rating: 0.0,
                    brand: "Thorne".to_owned(),
                }],
            },
            finished_at: chrono::Utc::now(),
        });
        summary
    }

    #[tokio::test]
    async fn tsv_export_writes_link_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.tsv");

        report_results(&summary_with_one_link(), Some(&path)).await;

        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body, "Zinc\tThorne\t12.50\thttps://thorne.com/zinc\n");
    }

    #[tokio::test]
    async fn unwritable_tsv_path_does_not_fail_reporting() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let path = blocker.join("links.tsv");

        assert!(export_tsv(&path, &summary_with_one_link()).await.is_err());
        // Reporting swallows the same failure so the run can still be finalized.
        report_results(&summary_with_one_link(), Some(&path)).await;
        assert!(!path.exists());
    }
}
