//! Fetch counters shared across traversals (thread-safe).

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::retry::{Retried, RetryOutcome};

#[derive(Debug, Clone, Default)]
pub struct FetchMetrics {
    /// Object-record calls, retries included
    pub object_requests: Arc<AtomicU64>,
    /// Snapshot-metadata calls, retries included
    pub meta_requests: Arc<AtomicU64>,
    /// Calls beyond the first for any fetch
    pub retries: Arc<AtomicU64>,
    /// Fetches answered with an authoritative "does not exist"
    pub not_found: Arc<AtomicU64>,
    /// Fetches that exhausted their attempts
    pub failed_fetches: Arc<AtomicU64>,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_object<T>(&self, r: &Retried<T>) {
        self.object_requests
            .fetch_add(r.attempts as u64, Ordering::Relaxed);
        self.record_common(r);
    }

    pub fn record_meta<T>(&self, r: &Retried<T>) {
        self.meta_requests
            .fetch_add(r.attempts as u64, Ordering::Relaxed);
        self.record_common(r);
    }

    fn record_common<T>(&self, r: &Retried<T>) {
        self.retries
            .fetch_add(r.retries() as u64, Ordering::Relaxed);
        match r.outcome {
            RetryOutcome::NotFound => {
                self.not_found.fetch_add(1, Ordering::Relaxed);
            }
            RetryOutcome::FetchFailed { .. } => {
                self.failed_fetches.fetch_add(1, Ordering::Relaxed);
            }
            RetryOutcome::Found(_) => {}
        }
    }

    /// Get a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            object_requests: self.object_requests.load(Ordering::Relaxed),
            meta_requests: self.meta_requests.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            failed_fetches: self.failed_fetches.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of metrics (for reporting).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub object_requests: u64,
    pub meta_requests: u64,
    pub retries: u64,
    pub not_found: u64,
    pub failed_fetches: u64,
}

impl MetricsSnapshot {
    pub fn total_requests(&self) -> u64 {
        self.object_requests + self.meta_requests
    }

    /// Format a human-readable report.
    pub fn format_report(&self) -> String {
        let lines = [
            "Fetch Metrics".to_string(),
            "=".repeat(30),
            format!("  Object requests: {}", self.object_requests),
            format!("  Meta requests:   {}", self.meta_requests),
            format!("  Retries:         {}", self.retries),
            format!("  Not found:       {}", self.not_found),
            format!("  Failed fetches:  {}", self.failed_fetches),
        ];
        lines.join("\n")
    }
}
