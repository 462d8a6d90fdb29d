//! Linear enumeration of one snapshot's catalog to find the entry with the largest
//! value of a field.
//!
//! The catalog numbers entries `0, 1, 2, …` with no holes, so the first `NotFound`
//! marks the end of the snapshot. That is assumed, not checked: an index whose fetch
//! keeps failing is skipped and listed in [`ScanReport::skipped`] so callers can tell
//! a clean scan from one with gaps.

use lineage_transport::RecordResolver;
use lineage_types::{CatalogKind, ObjectKey};
use serde::Serialize;
use tracing::{info, warn};

use crate::retry::{RetryOutcome, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub kind: CatalogKind,
    pub field: String,
    /// Indices `0..max_index` are probed at most.
    pub max_index: i64,
    pub progress_every: i64,
}

impl ScanConfig {
    pub fn new(field: &str) -> Self {
        Self {
            kind: CatalogKind::Halo,
            field: field.to_string(),
            max_index: 50_000,
            progress_every: 1000,
        }
    }

    pub fn with_kind(mut self, kind: CatalogKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_max_index(mut self, max_index: i64) -> Self {
        self.max_index = max_index;
        self
    }
}

/// Why the scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanEnd {
    /// The catalog has no entry at `index`.
    NotFound { index: i64 },
    /// `max_index` was reached.
    Ceiling,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub snapshot: i64,
    pub field: String,
    /// Largest value seen, `0.0` if nothing beat it.
    pub max_value: f64,
    pub max_index: Option<i64>,
    /// Indices probed, including the terminating one.
    pub probes: i64,
    /// Entries that were actually fetched.
    pub entries: i64,
    /// Indices abandoned after exhausting retries.
    pub skipped: Vec<i64>,
    pub end: ScanEnd,
}

impl ScanReport {
    pub fn max_key(&self) -> Option<ObjectKey> {
        self.max_index.map(|i| ObjectKey::new(self.snapshot, i))
    }
}

/// Probe `(snapshot, 0), (snapshot, 1), …` until the catalog runs out.
pub fn scan_max<R: RecordResolver + ?Sized>(
    resolver: &R,
    policy: &RetryPolicy,
    snapshot: i64,
    config: &ScanConfig,
) -> ScanReport {
    let mut report = ScanReport {
        snapshot,
        field: config.field.clone(),
        max_value: 0.0,
        max_index: None,
        probes: 0,
        entries: 0,
        skipped: Vec::new(),
        end: ScanEnd::Ceiling,
    };

    let mut index = 0i64;
    while index < config.max_index {
        let key = ObjectKey::new(snapshot, index);
        let fetched = policy.run(|| resolver.fetch_object(config.kind, key));
        report.probes += 1;

        match fetched.outcome {
            RetryOutcome::NotFound => {
                report.end = ScanEnd::NotFound { index };
                break;
            }
            RetryOutcome::FetchFailed { last_error } => {
                warn!(snapshot, index, error = %last_error, "skipping entry after failed fetch");
                report.skipped.push(index);
            }
            RetryOutcome::Found(record) => {
                report.entries += 1;
                if let Some(value) = record.field(&config.field) {
                    if value > report.max_value {
                        report.max_value = value;
                        report.max_index = Some(index);
                    }
                }
            }
        }

        if config.progress_every > 0 && index > 0 && index % config.progress_every == 0 {
            info!(
                snapshot,
                index,
                max_value = report.max_value,
                "scan progress"
            );
        }
        index += 1;
    }

    info!(
        snapshot,
        field = %config.field,
        max_value = report.max_value,
        max_index = ?report.max_index,
        probes = report.probes,
        skipped = report.skipped.len(),
        "scan complete"
    );
    report
}
