//! Catalog Transport Layer
//!
//! Network access to a simulation catalog web API (IllustrisTNG layout).
//!
//! This crate provides:
//! - [`resolver`]: the [`RecordResolver`] contract and its [`FetchOutcome`]
//! - [`config`]: explicit endpoint/credential/timeout configuration
//! - [`client`]: a blocking `ureq` implementation of the contract
//!
//! The resolver never retries. Retry lives one layer up so that chain traversal and
//! catalog enumeration share a single policy.
//!
//! # Example
//!
//! ```ignore
//! use lineage_transport::{CatalogClient, CatalogConfig, RecordResolver};
//! use lineage_types::{CatalogKind, ObjectKey};
//!
//! let client = CatalogClient::new(CatalogConfig::tng100().with_api_key(Some(key)));
//! let outcome = client.fetch_object(CatalogKind::Subhalo, ObjectKey::new(99, 227576));
//! ```

pub mod client;
pub mod config;
pub mod resolver;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main types for convenience
pub use client::CatalogClient;
pub use config::CatalogConfig;
pub use resolver::{FetchOutcome, RecordResolver};
