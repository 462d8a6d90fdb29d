//! Lineage Engine
//!
//! Turns catalog lookups into per-object histories.
//!
//! This crate provides:
//! - [`retry`]: bounded fixed-delay retry around any [`FetchOutcome`](lineage_transport::FetchOutcome)
//! - [`traversal`]: the progenitor walk from one root to its earliest ancestor
//! - [`scanner`]: linear enumeration of a snapshot to find a field maximum
//! - [`batch`]: many roots, isolated from each other, optionally in parallel
//! - [`lookup`] and [`candidates`]: single-field lookups and root selection from CSV
//! - [`sink`]: CSV and JSON output
//!
//! Everything is written against the [`RecordResolver`](lineage_transport::RecordResolver)
//! trait, so tests drive it with an in-memory catalog.
//!
//! # Example
//!
//! ```ignore
//! use lineage_engine::{traverse, RetryPolicy, TraversalConfig};
//! use lineage_transport::{CatalogClient, CatalogConfig};
//! use lineage_types::ObjectKey;
//!
//! let client = CatalogClient::new(CatalogConfig::from_env());
//! let config = TraversalConfig::new(vec!["mass_stars".into(), "sfr".into()]);
//! let report = traverse(&client, &RetryPolicy::default(), &config, ObjectKey::new(99, 227576));
//! println!("{} samples, {}", report.series.len(), report.termination);
//! ```

pub mod batch;
pub mod candidates;
pub mod lookup;
pub mod metrics;
pub mod retry;
pub mod scanner;
pub mod sink;
pub mod traversal;

pub use batch::{
    BatchConfig, BatchEntry, BatchOrchestrator, BatchOutcome, BatchProgress, BatchResult,
    BatchSummary, RootFailure,
};
pub use candidates::{load_candidates, load_lookup_rows, CandidateFilter};
pub use lookup::{lookup_fields, LookupRow, LookupStatus, RowKey};
pub use metrics::{FetchMetrics, MetricsSnapshot};
pub use retry::{Retried, RetryOutcome, RetryPolicy};
pub use scanner::{scan_max, ScanConfig, ScanEnd, ScanReport};
pub use sink::{write_batch, write_lookup_csv, write_series_csv};
pub use traversal::{
    boundary_check, follow_link, traverse, Boundary, FetchStage, ProgenitorWalker, Termination,
    TraversalConfig, TraversalReport, TraversalState,
};
