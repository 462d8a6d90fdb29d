//! Shared types for the lineage workspace.
//!
//! This crate provides the data model used by the transport and engine crates,
//! keeping both free of each other's internals.
//!
//! ## Records
//!
//! The [`record`] module contains what the catalog hands back:
//! - [`ObjectKey`](record::ObjectKey) - `(snapshot, id)` identity of a catalog entry
//! - [`ObjectRecord`](record::ObjectRecord) - numeric field map plus progenitor link
//! - [`SnapshotMeta`](record::SnapshotMeta) - per-snapshot redshift
//!
//! ## Series
//!
//! The [`series`] module contains what traversal produces:
//! - [`Chain`](series::Chain) - samples in visitation order (latest first)
//! - [`TimeSeries`](series::TimeSeries) - aligned chronological columns

pub mod env_utils;
pub mod record;
pub mod series;

// Re-export commonly used types at crate root
pub use env_utils::{env_bool, env_string_or, env_var, env_var_or};
pub use record::{
    CatalogKind, LinkFields, ObjectKey, ObjectRecord, ProgenitorLink, SnapshotMeta, SENTINEL_ID,
};
pub use series::{Chain, Sample, TimeSeries};

use std::time::Duration;

/// Configuration for retry behavior on catalog requests.
///
/// Delays are fixed between attempts; the request volume against the catalog
/// is low enough that backoff buys nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts per fetch, including the first one.
    pub max_attempts: usize,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryConfig {
    /// Create a new RetryConfig with the specified parameters.
    pub fn new(max_attempts: usize, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay: Duration::from_millis(delay_ms),
        }
    }

    /// Retry config that never sleeps. Used by tests and dry runs.
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    /// Attempts actually made; zero is treated as a single attempt.
    pub fn effective_attempts(&self) -> usize {
        self.max_attempts.max(1)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_defaults() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.delay, Duration::from_secs(2));
    }

    #[test]
    fn test_zero_attempts_is_one() {
        assert_eq!(RetryConfig::immediate(0).effective_attempts(), 1);
        assert_eq!(RetryConfig::new(5, 10).effective_attempts(), 5);
    }
}
