//! Batch traversal over many roots.
//!
//! Roots are independent: one root failing, or yielding nothing, never stops the rest.
//! With `parallelism > 1` roots run on a dedicated rayon pool; results still come back
//! in input order and each chain's fetches stay sequential.

use anyhow::{Context, Result};
use lineage_transport::RecordResolver;
use lineage_types::{ObjectKey, RetryConfig};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::metrics::{FetchMetrics, MetricsSnapshot};
use crate::retry::RetryPolicy;
use crate::traversal::{ProgenitorWalker, Termination, TraversalConfig, TraversalReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub traversal: TraversalConfig,
    pub retry: RetryConfig,
    /// Roots walked at once. `0` and `1` both mean sequential.
    pub parallelism: usize,
    /// Log a progress line every this many finished roots.
    pub progress_every: usize,
}

impl BatchConfig {
    pub fn new(traversal: TraversalConfig) -> Self {
        Self {
            traversal,
            retry: RetryConfig::default(),
            parallelism: 1,
            progress_every: 50,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }
}

/// Finished/failed counters, readable while a batch runs.
#[derive(Debug, Clone, Default)]
pub struct BatchProgress {
    completed: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
}

impl BatchProgress {
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn done(&self) -> usize {
        self.completed() + self.failed()
    }

    fn record(&self, failed: bool) -> usize {
        if failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.completed.fetch_add(1, Ordering::Relaxed);
        }
        self.done()
    }
}

/// A root whose own record could not be fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootFailure {
    pub termination: Termination,
    pub error: String,
    pub object_attempts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Completed(TraversalReport),
    Failed(RootFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry {
    pub root: ObjectKey,
    pub outcome: BatchOutcome,
}

impl BatchEntry {
    fn from_report(report: TraversalReport) -> Self {
        let root = report.root;
        let outcome = if report.is_root_failure() {
            BatchOutcome::Failed(RootFailure {
                error: report.termination.to_string(),
                object_attempts: report.object_attempts,
                termination: report.termination,
            })
        } else {
            BatchOutcome::Completed(report)
        };
        Self { root, outcome }
    }

    pub fn report(&self) -> Option<&TraversalReport> {
        match &self.outcome {
            BatchOutcome::Completed(r) => Some(r),
            BatchOutcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Failed(_))
    }
}

/// One line of the summary per root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootLine {
    pub root: ObjectKey,
    pub status: &'static str,
    pub samples: usize,
    pub reason: &'static str,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Completed roots that produced no samples.
    pub empty: usize,
    /// Samples across all completed roots.
    pub samples: usize,
    pub metrics: MetricsSnapshot,
    /// RFC 3339 timestamp.
    pub generated_at: String,
    pub roots: Vec<RootLine>,
}

/// Per-root outcomes in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub entries: Vec<BatchEntry>,
    pub metrics: MetricsSnapshot,
}

impl BatchResult {
    /// First entry for `root`.
    pub fn get(&self, root: ObjectKey) -> Option<&BatchEntry> {
        self.entries.iter().find(|e| e.root == root)
    }

    pub fn completed(&self) -> impl Iterator<Item = &TraversalReport> {
        self.entries.iter().filter_map(BatchEntry::report)
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries.iter().filter(|e| e.is_failed())
    }

    pub fn summary(&self) -> BatchSummary {
        let completed = self.completed().count();
        let empty = self.completed().filter(|r| r.series.is_empty()).count();
        let samples = self.completed().map(|r| r.series.len()).sum();
        let roots = self
            .entries
            .iter()
            .map(|e| match &e.outcome {
                BatchOutcome::Completed(r) => RootLine {
                    root: e.root,
                    status: "completed",
                    samples: r.series.len(),
                    reason: r.termination.reason(),
                    detail: r.termination.to_string(),
                },
                BatchOutcome::Failed(f) => RootLine {
                    root: e.root,
                    status: "failed",
                    samples: 0,
                    reason: f.termination.reason(),
                    detail: f.error.clone(),
                },
            })
            .collect();

        BatchSummary {
            total: self.entries.len(),
            completed,
            failed: self.entries.len() - completed,
            empty,
            samples,
            metrics: self.metrics,
            generated_at: chrono::Utc::now().to_rfc3339(),
            roots,
        }
    }
}

pub struct BatchOrchestrator<R> {
    resolver: R,
    config: BatchConfig,
    policy: RetryPolicy,
    progress: BatchProgress,
    metrics: FetchMetrics,
}

impl<R: RecordResolver> BatchOrchestrator<R> {
    pub fn new(resolver: R, config: BatchConfig) -> Self {
        let policy = RetryPolicy::new(config.retry);
        Self {
            resolver,
            config,
            policy,
            progress: BatchProgress::default(),
            metrics: FetchMetrics::new(),
        }
    }

    /// Swap the retry policy (e.g. one that does not really sleep).
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn progress(&self) -> BatchProgress {
        self.progress.clone()
    }

    pub fn metrics(&self) -> &FetchMetrics {
        &self.metrics
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Walk every root. Only building the thread pool can fail.
    pub fn run(&self, roots: &[ObjectKey]) -> Result<BatchResult> {
        let total = roots.len();
        info!(
            total,
            parallelism = self.config.parallelism.max(1),
            "starting batch"
        );

        let entries: Vec<BatchEntry> = if self.config.parallelism <= 1 {
            roots.iter().map(|root| self.walk(*root, total)).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.parallelism)
                .thread_name(|i| format!("lineage-batch-{}", i))
                .build()
                .context("Failed to build batch thread pool")?;
            pool.install(|| {
                roots
                    .par_iter()
                    .map(|root| self.walk(*root, total))
                    .collect()
            })
        };

        let progress = &self.progress;
        info!(
            "{}/{} roots processed ({} failed)",
            progress.done(),
            total,
            progress.failed()
        );

        Ok(BatchResult {
            entries,
            metrics: self.metrics.snapshot(),
        })
    }

    fn walk(&self, root: ObjectKey, total: usize) -> BatchEntry {
        let report = ProgenitorWalker::new(&self.resolver, &self.policy, &self.config.traversal, root)
            .with_metrics(self.metrics.clone())
            .run();
        let entry = BatchEntry::from_report(report);

        let done = self.progress.record(entry.is_failed());
        let every = self.config.progress_every;
        if every > 0 && done % every == 0 && done < total {
            info!("{}/{} roots processed", done, total);
        }
        entry
    }
}
