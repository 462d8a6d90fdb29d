//! Output formatting for the lineage CLI
//!
//! Human-readable text goes to stdout; logs go to stderr; `--json` prints one pretty
//! JSON document to stdout.

use anyhow::{Context, Result};
use lineage_engine::{BatchOutcome, BatchResult, LookupRow, MetricsSnapshot, ScanEnd, ScanReport};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize JSON output")?;
    println!("{}", text);
    Ok(())
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// One line per root, then totals.
pub fn format_batch(result: &BatchResult) -> String {
    let mut out = String::new();
    for entry in &result.entries {
        match &entry.outcome {
            BatchOutcome::Completed(report) => {
                let span = match (report.series.snapshots().first(), report.series.snapshots().last()) {
                    (Some(first), Some(last)) => format!("snapshots {}..{}", first, last),
                    _ => "no data".to_string(),
                };
                out.push_str(&format!(
                    "\x1b[32m✓\x1b[0m {:<16} {:>4} samples  {:<22} {}\n",
                    entry.root.to_string(),
                    report.series.len(),
                    span,
                    report.termination
                ));
            }
            BatchOutcome::Failed(failure) => {
                out.push_str(&format!(
                    "\x1b[31m✗\x1b[0m {:<16} {}\n",
                    entry.root.to_string(),
                    failure.error
                ));
            }
        }
    }

    let summary = result.summary();
    out.push_str(&format!(
        "\n{} roots: {} completed ({} empty), {} failed, {} samples\n",
        summary.total, summary.completed, summary.empty, summary.failed, summary.samples
    ));
    out
}

pub fn format_scan(report: &ScanReport) -> String {
    let mut out = String::new();
    match report.max_key() {
        Some(key) => out.push_str(&format!(
            "Max {} in snapshot {}: {} at {}\n",
            report.field,
            report.snapshot,
            format_value(Some(report.max_value)),
            key
        )),
        None => out.push_str(&format!(
            "No entry in snapshot {} has a positive {}\n",
            report.snapshot, report.field
        )),
    }
    let end = match report.end {
        ScanEnd::NotFound { index } => format!("catalog ends at index {}", index),
        ScanEnd::Ceiling => "stopped at --max-index".to_string(),
    };
    out.push_str(&format!(
        "{} entries, {} probes, {}\n",
        report.entries, report.probes, end
    ));
    if !report.skipped.is_empty() {
        out.push_str(&format!(
            "\x1b[33mSkipped after failed fetches:\x1b[0m {:?}\n",
            report.skipped
        ));
    }
    out
}

pub fn format_lookup(rows: &[LookupRow], field: &str) -> String {
    let mut out = format!("{:<16} {:>14}  status\n", "object", field);
    for row in rows {
        out.push_str(&format!(
            "{:<16} {:>14}  {}\n",
            row.key.to_string(),
            format_value(row.value),
            row.status.as_str()
        ));
    }
    out
}

pub fn format_metrics(metrics: &MetricsSnapshot) -> String {
    format!("{}\n", metrics.format_report())
}
