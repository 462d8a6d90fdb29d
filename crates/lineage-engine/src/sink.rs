//! Output files: per-root series CSVs, batch summaries and lookup tables.
//!
//! Every file is rendered in memory first and then written via tmp + rename, so a
//! crashed run never leaves a half-written CSV behind.

use anyhow::{anyhow, Context, Result};
use lineage_types::{ObjectKey, TimeSeries};
use std::path::{Path, PathBuf};

use crate::batch::BatchResult;
use crate::lookup::LookupRow;

pub const SUMMARY_FILE: &str = "summary.json";

pub fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| anyhow!("Failed to create directory {}: {}", parent.display(), e))?;
    }
    Ok(())
}

/// Write a file atomically (write to .tmp, then rename).
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent_dirs(path)?;
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|s| s.to_str()).unwrap_or("tmp")
    ));
    std::fs::write(&tmp_path, contents)
        .map_err(|e| anyhow!("Failed to write temp file {}: {}", tmp_path.display(), e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        anyhow!(
            "Failed to rename {} to {}: {}",
            tmp_path.display(),
            path.display(),
            e
        )
    })?;
    Ok(())
}

/// Pretty JSON, atomically.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json =
        serde_json::to_vec_pretty(value).map_err(|e| anyhow!("Failed to serialize JSON: {}", e))?;
    atomic_write(path, &json)
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn int_cell(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV buffer: {}", e.error()))
}

/// Render a series as CSV: `snapshot,object_id,redshift,<fields…>`, oldest first.
pub fn render_series_csv(series: &TimeSeries) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = vec![
        "snapshot".to_string(),
        "object_id".to_string(),
        "redshift".to_string(),
    ];
    header.extend(series.fields().iter().cloned());
    writer.write_record(&header).context("Failed to write CSV header")?;

    for sample in series.samples() {
        let mut row = vec![
            sample.key.snapshot.to_string(),
            sample.key.id.to_string(),
            cell(sample.redshift),
        ];
        row.extend(sample.values.iter().map(|v| cell(*v)));
        writer
            .write_record(&row)
            .with_context(|| format!("Failed to write CSV row for {}", sample.key))?;
    }
    finish_csv(writer)
}

pub fn write_series_csv(path: &Path, series: &TimeSeries) -> Result<()> {
    let bytes = render_series_csv(series)?;
    atomic_write(path, &bytes)
        .with_context(|| format!("Failed to write series for root {}", series.root()))
}

/// File name used for one root inside a batch directory.
pub fn series_file_name(root: ObjectKey) -> String {
    format!("root_{}_{}.csv", root.snapshot, root.id)
}

/// One CSV per completed root with samples, then `summary.json`.
///
/// Returns the paths written, summary last.
pub fn write_batch(dir: &Path, result: &BatchResult) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut written = Vec::new();
    for report in result.completed().filter(|r| !r.series.is_empty()) {
        let path = dir.join(series_file_name(report.root));
        write_series_csv(&path, &report.series)?;
        written.push(path);
    }

    let summary_path = dir.join(SUMMARY_FILE);
    atomic_write_json(&summary_path, &result.summary())?;
    written.push(summary_path);
    Ok(written)
}

/// Lookup table: `snapshot,id,<field>,status`, one line per input row.
pub fn render_lookup_csv(rows: &[LookupRow], field: &str) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["snapshot", "id", field, "status"])
        .context("Failed to write CSV header")?;
    for row in rows {
        writer
            .write_record([
                int_cell(row.key.snapshot),
                int_cell(row.key.id),
                cell(row.value),
                row.status.as_str().to_string(),
            ])
            .with_context(|| format!("Failed to write CSV row for {}", row.key))?;
    }
    finish_csv(writer)
}

pub fn write_lookup_csv(path: &Path, rows: &[LookupRow], field: &str) -> Result<()> {
    let bytes = render_lookup_csv(rows, field)?;
    atomic_write(path, &bytes)
}
