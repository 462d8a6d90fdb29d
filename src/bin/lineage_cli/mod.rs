//! CLI subcommand implementations for lineage

pub mod lookup;
pub mod output;
pub mod scan;
pub mod track;

use lineage::args::{CatalogArgs, CatalogConfigExt, RetryArgs, RetryConfigExt};
use lineage_transport::{CatalogClient, CatalogConfig};
use lineage_types::RetryConfig;
use tracing::debug;

/// Catalog client and retry settings shared by every subcommand.
pub fn connect(catalog: &CatalogArgs, retry: &RetryArgs) -> (CatalogClient, RetryConfig) {
    let config = CatalogConfig::from_args(catalog);
    debug!(?config, "catalog configuration");
    (CatalogClient::new(config), RetryConfig::from_args(retry))
}
