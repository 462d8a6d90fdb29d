//! Catalog endpoint configuration.
//!
//! Configuration is an explicit value handed to [`CatalogClient::new`](crate::CatalogClient::new);
//! nothing here is process-global. [`CatalogConfig::from_env`] reads:
//!
//! - `LINEAGE_BASE_URL` - API root (default: `https://www.tng-project.org/api`)
//! - `LINEAGE_SIMULATION` - simulation name (default: `TNG100-1`)
//! - `LINEAGE_API_KEY` - credential sent as the `api-key` header
//! - `LINEAGE_TIMEOUT_SECS` / `LINEAGE_CONNECT_TIMEOUT_SECS`
//! - `LINEAGE_REQUEST_INTERVAL_MS` - minimum spacing between requests

use lineage_types::{env_string_or, env_var_or, CatalogKind, LinkFields, ObjectKey};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.tng-project.org/api";
pub const DEFAULT_SIMULATION: &str = "TNG100-1";

/// Endpoint, credential and timing for one catalog.
#[derive(Clone)]
pub struct CatalogConfig {
    pub base_url: String,
    pub simulation: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Courtesy spacing between consecutive requests through one client. Zero disables it.
    pub min_request_interval: Duration,
    pub link_fields: LinkFields,
}

impl CatalogConfig {
    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Default connect timeout in seconds.
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
    /// Request spacing used by [`CatalogConfig::from_env`] when none is configured.
    pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 200;

    pub fn new(base_url: &str, simulation: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            simulation: simulation.trim_matches('/').to_string(),
            api_key: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(Self::DEFAULT_CONNECT_TIMEOUT_SECS),
            min_request_interval: Duration::ZERO,
            link_fields: LinkFields::default(),
        }
    }

    /// TNG100-1 on the public API.
    pub fn tng100() -> Self {
        Self::new(DEFAULT_BASE_URL, "TNG100-1")
    }

    /// TNG50-1 on the public API.
    pub fn tng50() -> Self {
        Self::new(DEFAULT_BASE_URL, "TNG50-1")
    }

    /// Build from `LINEAGE_*` environment variables, falling back to TNG100-1 defaults.
    pub fn from_env() -> Self {
        Self::from_env_prefixed("LINEAGE")
    }

    fn from_env_prefixed(prefix: &str) -> Self {
        let key = |name: &str| format!("{}_{}", prefix, name);
        let base = env_string_or(&key("BASE_URL"), DEFAULT_BASE_URL);
        let sim = env_string_or(&key("SIMULATION"), DEFAULT_SIMULATION);
        let api_key = std::env::var(key("API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());
        let timeout = env_var_or(&key("TIMEOUT_SECS"), Self::DEFAULT_TIMEOUT_SECS);
        let connect = env_var_or(
            &key("CONNECT_TIMEOUT_SECS"),
            Self::DEFAULT_CONNECT_TIMEOUT_SECS,
        );
        let interval = env_var_or(
            &key("REQUEST_INTERVAL_MS"),
            Self::DEFAULT_REQUEST_INTERVAL_MS,
        );

        Self::new(&base, &sim)
            .with_api_key(api_key)
            .with_timeout(Duration::from_secs(timeout))
            .with_connect_timeout(Duration::from_secs(connect))
            .with_request_interval(Duration::from_millis(interval))
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    pub fn with_link_fields(mut self, link_fields: LinkFields) -> Self {
        self.link_fields = link_fields;
        self
    }

    /// `{base}/{simulation}`
    pub fn simulation_url(&self) -> String {
        format!("{}/{}", self.base_url, self.simulation)
    }

    /// `{base}/{simulation}/snapshots/{snap}/`
    pub fn snapshot_url(&self, snapshot: i64) -> String {
        format!("{}/snapshots/{}/", self.simulation_url(), snapshot)
    }

    /// Record URL for either namespace. Halos are served from their `info.json`.
    pub fn object_url(&self, kind: CatalogKind, key: ObjectKey) -> String {
        match kind {
            CatalogKind::Subhalo => format!(
                "{}/snapshots/{}/subhalos/{}/",
                self.simulation_url(),
                key.snapshot,
                key.id
            ),
            CatalogKind::Halo => format!(
                "{}/snapshots/{}/halos/{}/info.json",
                self.simulation_url(),
                key.snapshot,
                key.id
            ),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self::tng100()
    }
}

// Hand-written so the credential never lands in logs.
impl fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("base_url", &self.base_url)
            .field("simulation", &self.simulation)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("min_request_interval", &self.min_request_interval)
            .field("link_fields", &self.link_fields)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let cfg = CatalogConfig::new("http://localhost:8000/api/", "/TNG50-1/");
        assert_eq!(cfg.simulation_url(), "http://localhost:8000/api/TNG50-1");
        assert_eq!(
            cfg.snapshot_url(99),
            "http://localhost:8000/api/TNG50-1/snapshots/99/"
        );
        assert_eq!(
            cfg.object_url(CatalogKind::Subhalo, ObjectKey::new(99, 227576)),
            "http://localhost:8000/api/TNG50-1/snapshots/99/subhalos/227576/"
        );
        assert_eq!(
            cfg.object_url(CatalogKind::Halo, ObjectKey::new(99, 0)),
            "http://localhost:8000/api/TNG50-1/snapshots/99/halos/0/info.json"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let cfg = CatalogConfig::tng50().with_api_key(Some("secret-token".to_string()));
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("secret-token"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("LINEAGE_TEST_CFG_SIMULATION", "TNG300-1");
        std::env::set_var("LINEAGE_TEST_CFG_REQUEST_INTERVAL_MS", "50");
        let cfg = CatalogConfig::from_env_prefixed("LINEAGE_TEST_CFG");
        assert_eq!(cfg.simulation, "TNG300-1");
        assert_eq!(cfg.min_request_interval, Duration::from_millis(50));
        std::env::remove_var("LINEAGE_TEST_CFG_SIMULATION");
        std::env::remove_var("LINEAGE_TEST_CFG_REQUEST_INTERVAL_MS");
    }

    #[test]
    fn test_from_env_defaults() {
        let cfg = CatalogConfig::from_env_prefixed("LINEAGE_TEST_CFG_UNSET");
        assert_eq!(cfg.simulation, DEFAULT_SIMULATION);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(
            cfg.min_request_interval,
            Duration::from_millis(CatalogConfig::DEFAULT_REQUEST_INTERVAL_MS)
        );
    }
}
