//! Progenitor Lineage Tracker
//!
//! Follows merger-tree progenitor links in a simulation catalog web API and turns
//! each chain into aligned, chronological per-field time series:
//!
//! - **Types**: keys, records and series ([`lineage_types`])
//! - **Transport**: the blocking catalog client ([`lineage_transport`])
//! - **Engine**: traversal, enumeration, batching and output ([`lineage_engine`])
//!
//! See [`args`] for the shared command-line configuration used by the `lineage` binary.

pub mod args;

pub use lineage_engine as engine;
pub use lineage_transport as transport;
pub use lineage_types as types;
