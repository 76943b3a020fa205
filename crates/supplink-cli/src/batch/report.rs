//! Batch outcomes, aggregation, and the files and text produced from them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use supplink_core::ProductLink;

/// How many entries the printed summary lists per section.
const SUMMARY_LIST_LEN: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum ItemOutcome {
    Succeeded { links: Vec<ProductLink> },
    /// Collection finished without a single approved link.
    NoLinks,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ItemReport {
    /// Position in the full item list; `--start` values refer to this.
    pub index: usize,
    pub item: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
    pub finished_at: DateTime<Utc>,
}

impl ItemReport {
    pub(crate) fn link_count(&self) -> usize {
        match &self.outcome {
            ItemOutcome::Succeeded { links } => links.len(),
            ItemOutcome::NoLinks | ItemOutcome::Failed { .. } => 0,
        }
    }

    fn failure_label(&self) -> Option<&str> {
        match &self.outcome {
            ItemOutcome::Succeeded { .. } => None,
            ItemOutcome::NoLinks => Some("no links"),
            ItemOutcome::Failed { error } => Some(error.as_str()),
        }
    }
}

/// Everything a batch run produced. Built by the single consumer of the
/// outcome stream.
#[derive(Debug, Default)]
pub(crate) struct BatchSummary {
    pub start: usize,
    pub total_items: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_links: usize,
    pub interrupted: bool,
    /// Completion order, which differs from item order when workers > 1.
    pub reports: Vec<ItemReport>,
}

impl BatchSummary {
    pub(crate) fn new(start: usize, total_items: usize) -> Self {
        Self {
            start,
            total_items,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, report: ItemReport) {
        match &report.outcome {
            ItemOutcome::Succeeded { links } => {
                self.succeeded += 1;
                self.total_links += links.len();
            }
            ItemOutcome::NoLinks | ItemOutcome::Failed { .. } => self.failed += 1,
        }
        self.reports.push(report);
    }

    pub(crate) fn processed(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Resume offset: the first index at or after `start` with no report.
    pub(crate) fn next_index(&self) -> usize {
        let done: HashSet<usize> = self.reports.iter().map(|r| r.index).collect();
        (self.start..)
            .find(|i| !done.contains(i))
            .unwrap_or(self.total_items)
            .min(self.total_items)
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn success_rate(&self) -> f64 {
        if self.processed() == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.processed() as f64 * 100.0
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn average_links(&self) -> f64 {
        if self.succeeded == 0 {
            return 0.0;
        }
        self.total_links as f64 / self.succeeded as f64
    }

    pub(crate) fn in_item_order(&self) -> Vec<&ItemReport> {
        let mut reports: Vec<&ItemReport> = self.reports.iter().collect();
        reports.sort_by_key(|r| r.index);
        reports
    }

    /// Successful items by link count, most first; ties keep item order.
    pub(crate) fn top_items(&self, n: usize) -> Vec<&ItemReport> {
        let mut top: Vec<&ItemReport> = self
            .in_item_order()
            .into_iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Succeeded { .. }))
            .collect();
        top.sort_by(|a, b| b.link_count().cmp(&a.link_count()));
        top.truncate(n);
        top
    }

    pub(crate) fn failed_items(&self) -> Vec<&ItemReport> {
        self.in_item_order()
            .into_iter()
            .filter(|r| r.failure_label().is_some())
            .collect()
    }
}

#[derive(Serialize)]
struct Checkpoint<'a> {
    next_index: usize,
    start: usize,
    total_items: usize,
    processed: usize,
    succeeded: usize,
    failed: usize,
    total_links: usize,
    interrupted: bool,
    written_at: DateTime<Utc>,
    results: Vec<&'a ItemReport>,
}

/// Writes the summary as pretty JSON to `dir/progress_<timestamp>.json`.
pub(crate) async fn write_checkpoint(dir: &Path, summary: &BatchSummary) -> anyhow::Result<PathBuf> {
    let written_at = Utc::now();
    let checkpoint = Checkpoint {
        next_index: summary.next_index(),
        start: summary.start,
        total_items: summary.total_items,
        processed: summary.processed(),
        succeeded: summary.succeeded,
        failed: summary.failed,
        total_links: summary.total_links,
        interrupted: summary.interrupted,
        written_at,
        results: summary.in_item_order(),
    };
    let body = serde_json::to_string_pretty(&checkpoint)?;

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!(
        "progress_{}.json",
        written_at.format("%Y%m%d_%H%M%S")
    ));
    tokio::fs::write(&path, body).await?;
    Ok(path)
}

/// One `item\tbrand\tprice\turl` line per collected link, in item order.
pub(crate) fn render_tsv(summary: &BatchSummary) -> String {
    let mut out = String::new();
    for report in summary.in_item_order() {
        let ItemOutcome::Succeeded { links } = &report.outcome else {
            continue;
        };
        for link in links {
            let line = format!(
                "{}\t{}\t{:.2}\t{}\n",
                tsv_field(&report.item),
                tsv_field(&link.brand),
                link.price,
                tsv_field(&link.url)
            );
            out.push_str(&line);
        }
    }
    out
}

fn tsv_field(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

pub(crate) fn render_summary(summary: &BatchSummary) -> String {
    let rule = "=".repeat(72);
    let mut lines = vec![
        rule.clone(),
        "BATCH SUMMARY".to_string(),
        rule.clone(),
        format!(
            "Items processed:        {} (of {} from index {})",
            summary.processed(),
            summary.total_items.saturating_sub(summary.start),
            summary.start
        ),
        format!("Succeeded:              {}", summary.succeeded),
        format!("Failed:                 {}", summary.failed),
        format!("Success rate:           {:.1}%", summary.success_rate()),
        format!("Total links found:      {}", summary.total_links),
        format!("Avg links per success:  {:.1}", summary.average_links()),
    ];
    if summary.interrupted {
        lines.push(format!(
            "Interrupted; resume with --start {}",
            summary.next_index()
        ));
    }
    lines.push(rule);

    let top = summary.top_items(SUMMARY_LIST_LEN);
    if !top.is_empty() {
        lines.push(String::new());
        lines.push(format!("Top {} items by links found:", top.len()));
        for (i, report) in top.iter().enumerate() {
            lines.push(format!(
                "{:>2}. {}: {} links",
                i + 1,
                report.item,
                report.link_count()
            ));
        }
    }

    let failed = summary.failed_items();
    if !failed.is_empty() {
        lines.push(String::new());
        lines.push(format!("Items without links ({}):", failed.len()));
        for report in failed.iter().take(SUMMARY_LIST_LEN) {
            let label = report.failure_label().unwrap_or_default();
            lines.push(format!("   - {} ({label})", report.item));
        }
        if failed.len() > SUMMARY_LIST_LEN {
            lines.push(format!("   ... and {} more", failed.len() - SUMMARY_LIST_LEN));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
