//! Progenitor-chain traversal.
//!
//! A walk starts at a root key and follows progenitor links backward in time, one
//! object fetch and one snapshot-metadata fetch per step, until a [`Termination`] is
//! reached. The walk is an explicit state machine so it can be stepped from tests and
//! so that every way a chain ends has a name.
//!
//! ```text
//! Active(key) --boundary_check--> Done(BoundaryReached)
//!             --fetch object----> Done(ObjectMissing | FetchFailed{Object})
//!             --fetch meta------> Done(FetchFailed{SnapshotMeta})   (sample kept, redshift None)
//!             --follow_link-----> Active(next) | Done(NonMonotonicLink)
//! ```

use lineage_transport::RecordResolver;
use lineage_types::{
    CatalogKind, Chain, ObjectKey, ProgenitorLink, Sample, TimeSeries, SENTINEL_ID,
};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::metrics::FetchMetrics;
use crate::retry::{RetryOutcome, RetryPolicy};

/// Which fetch of a step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStage {
    Object,
    SnapshotMeta,
}

/// Natural end of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// The link carried the sentinel id.
    Sentinel,
    /// The link pointed below the configured floor.
    SnapshotFloor { snapshot: i64, floor: i64 },
}

/// Why a walk stopped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    BoundaryReached(Boundary),
    /// A link that does not go strictly backward in time.
    NonMonotonicLink { from: ObjectKey, to: ObjectKey },
    /// `max_steps` samples were collected.
    StepLimit,
    /// The catalog says the key does not exist.
    ObjectMissing { key: ObjectKey },
    FetchFailed {
        key: ObjectKey,
        stage: FetchStage,
        error: String,
        attempts: usize,
    },
}

impl Termination {
    /// Short machine-friendly name.
    pub fn reason(&self) -> &'static str {
        match self {
            Termination::BoundaryReached(Boundary::Sentinel) => "sentinel",
            Termination::BoundaryReached(Boundary::SnapshotFloor { .. }) => "snapshot_floor",
            Termination::NonMonotonicLink { .. } => "non_monotonic_link",
            Termination::StepLimit => "step_limit",
            Termination::ObjectMissing { .. } => "object_missing",
            Termination::FetchFailed { .. } => "fetch_failed",
        }
    }

    /// Ended because something went wrong rather than because the history ran out.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Termination::ObjectMissing { .. } | Termination::FetchFailed { .. }
        )
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::BoundaryReached(Boundary::Sentinel) => {
                write!(f, "no further progenitor")
            }
            Termination::BoundaryReached(Boundary::SnapshotFloor { snapshot, floor }) => {
                write!(f, "snapshot {} is below floor {}", snapshot, floor)
            }
            Termination::NonMonotonicLink { from, to } => {
                write!(f, "link {} -> {} does not go back in time", from, to)
            }
            Termination::StepLimit => write!(f, "step limit reached"),
            Termination::ObjectMissing { key } => write!(f, "object {} not found", key),
            Termination::FetchFailed {
                key,
                stage,
                error,
                attempts,
            } => {
                let what = match stage {
                    FetchStage::Object => "object",
                    FetchStage::SnapshotMeta => "snapshot metadata",
                };
                write!(
                    f,
                    "{} fetch for {} failed after {} attempts: {}",
                    what, key, attempts, error
                )
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraversalState {
    Active(ObjectKey),
    Done(Termination),
}

impl TraversalState {
    pub fn is_done(&self) -> bool {
        matches!(self, TraversalState::Done(_))
    }
}

/// What to collect and where to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalConfig {
    /// Fields sampled at every step, in output column order.
    pub fields: Vec<String>,
    pub kind: CatalogKind,
    /// Keys with a snapshot below this end the chain.
    pub snapshot_floor: i64,
    /// Upper bound on collected samples, if any.
    pub max_steps: Option<usize>,
}

impl TraversalConfig {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn with_floor(mut self, floor: i64) -> Self {
        self.snapshot_floor = floor;
        self
    }

    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_kind(mut self, kind: CatalogKind) -> Self {
        self.kind = kind;
        self
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            kind: CatalogKind::Subhalo,
            snapshot_floor: 0,
            max_steps: None,
        }
    }
}

/// Result of walking one root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraversalReport {
    pub root: ObjectKey,
    pub series: TimeSeries,
    pub termination: Termination,
    /// Object fetch calls, retries included.
    pub object_attempts: usize,
    /// Snapshot metadata calls, retries included.
    pub meta_attempts: usize,
}

impl TraversalReport {
    /// The root itself could not be fetched.
    ///
    /// An empty series that ended on a boundary is "no data", not a failure.
    pub fn is_root_failure(&self) -> bool {
        self.series.is_empty() && self.termination.is_failure()
    }
}

/// Stop before fetching `key` if it lies outside the walkable range.
pub fn boundary_check(key: ObjectKey, floor: i64) -> Option<Boundary> {
    if key.is_sentinel() {
        return Some(Boundary::Sentinel);
    }
    if key.snapshot < floor {
        return Some(Boundary::SnapshotFloor {
            snapshot: key.snapshot,
            floor,
        });
    }
    None
}

/// State after a record at `from` pointed at `link`.
///
/// A missing link is treated as the sentinel; the next step's boundary check ends the walk.
pub fn follow_link(from: ObjectKey, link: Option<ProgenitorLink>) -> TraversalState {
    let next = link
        .map(|l| l.key())
        .unwrap_or(ObjectKey::new(SENTINEL_ID, SENTINEL_ID));
    if !next.is_sentinel() && next.snapshot >= from.snapshot {
        return TraversalState::Done(Termination::NonMonotonicLink { from, to: next });
    }
    TraversalState::Active(next)
}

/// Steps one root's chain through the resolver.
pub struct ProgenitorWalker<'a, R: RecordResolver + ?Sized> {
    resolver: &'a R,
    policy: &'a RetryPolicy,
    config: &'a TraversalConfig,
    metrics: Option<FetchMetrics>,
    root: ObjectKey,
    state: TraversalState,
    chain: Chain,
    object_attempts: usize,
    meta_attempts: usize,
}

impl<'a, R: RecordResolver + ?Sized> ProgenitorWalker<'a, R> {
    pub fn new(
        resolver: &'a R,
        policy: &'a RetryPolicy,
        config: &'a TraversalConfig,
        root: ObjectKey,
    ) -> Self {
        Self {
            resolver,
            policy,
            config,
            metrics: None,
            root,
            state: TraversalState::Active(root),
            chain: Chain::new(),
            object_attempts: 0,
            meta_attempts: 0,
        }
    }

    /// Count fetches into shared metrics.
    pub fn with_metrics(mut self, metrics: FetchMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> &TraversalState {
        &self.state
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Perform one transition. A finished walk stays finished.
    pub fn step(&mut self) -> &TraversalState {
        if let TraversalState::Active(key) = self.state {
            self.state = self.advance(key);
        }
        &self.state
    }

    fn advance(&mut self, key: ObjectKey) -> TraversalState {
        if let Some(boundary) = boundary_check(key, self.config.snapshot_floor) {
            return TraversalState::Done(Termination::BoundaryReached(boundary));
        }
        if let Some(max) = self.config.max_steps {
            if self.chain.len() >= max {
                return TraversalState::Done(Termination::StepLimit);
            }
        }

        debug!(root = %self.root, snapshot = key.snapshot, id = key.id, "fetching progenitor");

        let kind = self.config.kind;
        let fetched = self.policy.run(|| self.resolver.fetch_object(kind, key));
        self.object_attempts += fetched.attempts;
        if let Some(m) = &self.metrics {
            m.record_object(&fetched);
        }
        if fetched.retries() > 0 && !fetched.is_failed() {
            warn!(key = %key, retries = fetched.retries(), "object fetch needed retries");
        }

        let record = match fetched.outcome {
            RetryOutcome::Found(record) => record,
            RetryOutcome::NotFound => {
                return TraversalState::Done(Termination::ObjectMissing { key });
            }
            RetryOutcome::FetchFailed { last_error } => {
                warn!(key = %key, attempts = fetched.attempts, error = %last_error, "object fetch failed");
                return TraversalState::Done(Termination::FetchFailed {
                    key,
                    stage: FetchStage::Object,
                    error: last_error,
                    attempts: fetched.attempts,
                });
            }
        };

        self.chain.push(Sample {
            key,
            values: record.select(&self.config.fields),
            redshift: None,
        });

        let meta = self
            .policy
            .run(|| self.resolver.fetch_snapshot_meta(key.snapshot));
        self.meta_attempts += meta.attempts;
        if let Some(m) = &self.metrics {
            m.record_meta(&meta);
        }

        match meta.outcome {
            RetryOutcome::Found(meta) => {
                if let Some(sample) = self.chain.last_mut() {
                    sample.redshift = Some(meta.redshift);
                }
            }
            RetryOutcome::NotFound => {
                warn!(snapshot = key.snapshot, "snapshot metadata not found");
                return TraversalState::Done(Termination::FetchFailed {
                    key,
                    stage: FetchStage::SnapshotMeta,
                    error: format!("snapshot {} not found", key.snapshot),
                    attempts: meta.attempts,
                });
            }
            RetryOutcome::FetchFailed { last_error } => {
                warn!(snapshot = key.snapshot, attempts = meta.attempts, error = %last_error, "snapshot metadata fetch failed");
                return TraversalState::Done(Termination::FetchFailed {
                    key,
                    stage: FetchStage::SnapshotMeta,
                    error: last_error,
                    attempts: meta.attempts,
                });
            }
        }

        let next = follow_link(key, record.progenitor);
        if let TraversalState::Done(Termination::NonMonotonicLink { from, to }) = &next {
            warn!(from = %from, to = %to, "progenitor link does not go back in time");
        }
        next
    }

    /// Build the report from wherever the walk is.
    ///
    /// A walk stopped while still active is reported as [`Termination::StepLimit`].
    pub fn finish(self) -> TraversalReport {
        let termination = match self.state {
            TraversalState::Done(t) => t,
            TraversalState::Active(_) => Termination::StepLimit,
        };
        TraversalReport {
            root: self.root,
            series: TimeSeries::from_chain(self.root, self.config.fields.clone(), self.chain),
            termination,
            object_attempts: self.object_attempts,
            meta_attempts: self.meta_attempts,
        }
    }

    /// Step until done and report.
    pub fn run(mut self) -> TraversalReport {
        while !self.step().is_done() {}
        let report = self.finish();
        info!(
            root = %report.root,
            samples = report.series.len(),
            reason = report.termination.reason(),
            "chain complete"
        );
        report
    }
}

/// Walk one root to completion.
pub fn traverse<R: RecordResolver + ?Sized>(
    resolver: &R,
    policy: &RetryPolicy,
    config: &TraversalConfig,
    root: ObjectKey,
) -> TraversalReport {
    ProgenitorWalker::new(resolver, policy, config, root).run()
}
