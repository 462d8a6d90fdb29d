//! Command-line arguments shared by every `lineage` subcommand.
//!
//! Flags override `LINEAGE_*` environment variables, which override built-in defaults.

use anyhow::{bail, Result};
use clap::Args;
use lineage_transport::CatalogConfig;
use lineage_types::{CatalogKind, LinkFields};
use std::time::Duration;

/// Where the catalog lives and how to talk to it.
#[derive(Debug, Clone, Args)]
pub struct CatalogArgs {
    /// API root (default: the public TNG API)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Simulation name, e.g. TNG100-1 or TNG50-1
    #[arg(long, global = true)]
    pub simulation: Option<String>,

    /// API key sent as the `api-key` header
    #[arg(long, global = true, env = "LINEAGE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Minimum spacing between requests in milliseconds (0 disables; default 200)
    #[arg(long, global = true)]
    pub request_interval_ms: Option<u64>,

    /// Record field holding the progenitor snapshot
    #[arg(long, global = true, default_value = "prog_snap")]
    pub link_snapshot_field: String,

    /// Record field holding the progenitor id
    #[arg(long, global = true, default_value = "prog_sfid")]
    pub link_id_field: String,
}

/// Retry behavior for every fetch.
#[derive(Debug, Clone, Copy, Args)]
pub struct RetryArgs {
    /// Attempts per fetch, including the first
    #[arg(long, global = true, default_value_t = 3)]
    pub retries: usize,

    /// Fixed delay between attempts in milliseconds
    #[arg(long, global = true, default_value_t = 2000)]
    pub retry_delay_ms: u64,
}

// Re-export RetryConfig from the shared types crate
pub use lineage_types::RetryConfig;

/// Extension trait to create RetryConfig from args.
pub trait RetryConfigExt {
    fn from_args(args: &RetryArgs) -> RetryConfig;
}

impl RetryConfigExt for RetryConfig {
    fn from_args(args: &RetryArgs) -> RetryConfig {
        RetryConfig::new(args.retries, args.retry_delay_ms)
    }
}

/// Extension trait to create CatalogConfig from args, layered over the environment.
pub trait CatalogConfigExt {
    fn from_args(args: &CatalogArgs) -> CatalogConfig;
}

impl CatalogConfigExt for CatalogConfig {
    fn from_args(args: &CatalogArgs) -> CatalogConfig {
        let env = CatalogConfig::from_env();
        let base = args.base_url.as_deref().unwrap_or(&env.base_url);
        let sim = args.simulation.as_deref().unwrap_or(&env.simulation);

        let timeout = args
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(env.timeout);
        let interval = args
            .request_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(env.min_request_interval);
        let api_key = args
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or(env.api_key.clone());

        CatalogConfig::new(base, sim)
            .with_api_key(api_key)
            .with_timeout(timeout)
            .with_connect_timeout(env.connect_timeout)
            .with_request_interval(interval)
            .with_link_fields(LinkFields {
                snapshot_field: args.link_snapshot_field.clone(),
                id_field: args.link_id_field.clone(),
            })
    }
}

impl CatalogArgs {
    /// Validate argument values that clap cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        if let Some(0) = self.timeout_secs {
            bail!("--timeout-secs must be at least 1");
        }
        if let Some(url) = &self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("--base-url must start with http:// or https://, got '{}'", url);
            }
        }
        if self.link_snapshot_field.trim().is_empty() || self.link_id_field.trim().is_empty() {
            bail!("link field names must not be empty");
        }
        Ok(())
    }
}

/// Parse a catalog namespace for clap.
pub fn parse_kind(s: &str) -> Result<CatalogKind, String> {
    s.parse::<CatalogKind>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        catalog: CatalogArgs,
        #[command(flatten)]
        retry: RetryArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::parse_from(["lineage"]);
        let retry = RetryConfig::from_args(&cli.retry);
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.delay, Duration::from_secs(2));
        assert_eq!(cli.catalog.request_interval_ms, None);
        assert!(cli.catalog.validate().is_ok());
    }

    #[test]
    fn test_flags_override() {
        let cli = TestCli::parse_from([
            "lineage",
            "--base-url",
            "http://127.0.0.1:1/api/",
            "--simulation",
            "TNG50-1",
            "--timeout-secs",
            "5",
            "--request-interval-ms",
            "0",
            "--retries",
            "1",
            "--retry-delay-ms",
            "0",
        ]);
        let cfg = CatalogConfig::from_args(&cli.catalog);
        assert_eq!(cfg.base_url, "http://127.0.0.1:1/api");
        assert_eq!(cfg.simulation, "TNG50-1");
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert!(cfg.min_request_interval.is_zero());
        assert_eq!(RetryConfig::from_args(&cli.retry), RetryConfig::immediate(1));
    }

    #[test]
    fn test_unset_interval_falls_back_to_config_default() {
        let cli = TestCli::parse_from(["lineage"]);
        let cfg = CatalogConfig::from_args(&cli.catalog);
        assert_eq!(cfg.min_request_interval, CatalogConfig::from_env().min_request_interval);
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let cli = TestCli::parse_from(["lineage", "--base-url", "ftp://x"]);
        assert!(cli.catalog.validate().is_err());
        let cli = TestCli::parse_from(["lineage", "--timeout-secs", "0"]);
        assert!(cli.catalog.validate().is_err());
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("halo"), Ok(CatalogKind::Halo));
        assert!(parse_kind("star").is_err());
    }
}
