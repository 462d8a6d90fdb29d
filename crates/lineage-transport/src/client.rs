//! Blocking HTTP client for the catalog API.
//!
//! Status mapping:
//! - `200` with a JSON body: `Found`
//! - `404`: `NotFound`
//! - any other status, transport error, timeout, HTML error page or bad JSON: `Transient`

use lineage_types::{CatalogKind, ObjectKey, ObjectRecord, SnapshotMeta};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

use crate::config::CatalogConfig;
use crate::resolver::{FetchOutcome, RecordResolver};

/// Longest body excerpt carried in an error message.
const ERROR_BODY_EXCERPT: usize = 300;

/// Catalog client backed by a `ureq` agent.
///
/// The agent's connection pool is shared by every thread using the client; the
/// request-spacing gate is the only lock.
pub struct CatalogClient {
    config: CatalogConfig,
    agent: ureq::Agent,
    last_request: Mutex<Option<Instant>>,
    requests: AtomicU64,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> Self {
        let agent = Self::build_agent(config.timeout, config.connect_timeout);
        Self {
            config,
            agent,
            last_request: Mutex::new(None),
            requests: AtomicU64::new(0),
        }
    }

    fn build_agent(timeout: Duration, connect_timeout: Duration) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(timeout)
            .timeout_connect(connect_timeout)
            .build()
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Requests issued so far (including failed ones).
    pub fn requests_sent(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Wait until `min_request_interval` has passed since the previous request.
    fn throttle(&self) {
        let interval = self.config.min_request_interval;
        if interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock();
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    /// GET a URL and decode its JSON body.
    pub fn get_json(&self, url: &str) -> FetchOutcome<Value> {
        self.throttle();
        self.requests.fetch_add(1, Ordering::Relaxed);
        trace!(url, "catalog GET");

        let mut request = self.agent.get(url).set("Accept", "application/json");
        if let Some(key) = &self.config.api_key {
            request = request.set("api-key", key);
        }

        match request.call() {
            Ok(response) => match response.into_string() {
                Ok(body) => decode_body(url, &body),
                Err(e) => FetchOutcome::Transient(format!("failed to read body from {}: {}", url, e)),
            },
            Err(ureq::Error::Status(404, _)) => FetchOutcome::NotFound,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                FetchOutcome::Transient(format!(
                    "HTTP {} from {}: {}",
                    code,
                    url,
                    excerpt(&body)
                ))
            }
            Err(e) => FetchOutcome::Transient(format!("request to {} failed: {}", url, e)),
        }
    }
}

impl RecordResolver for CatalogClient {
    fn fetch_object(&self, kind: CatalogKind, key: ObjectKey) -> FetchOutcome<ObjectRecord> {
        if key.is_sentinel() {
            return FetchOutcome::Transient(format!("invalid {} key {}", kind, key));
        }
        let url = self.config.object_url(kind, key);
        self.get_json(&url)
            .parse(|body| ObjectRecord::from_json(key, &body, &self.config.link_fields))
    }

    fn fetch_snapshot_meta(&self, snapshot: i64) -> FetchOutcome<SnapshotMeta> {
        if snapshot < 0 {
            return FetchOutcome::Transient(format!("invalid snapshot {}", snapshot));
        }
        let url = self.config.snapshot_url(snapshot);
        self.get_json(&url)
            .parse(|body| SnapshotMeta::from_json(snapshot, &body))
    }
}

/// A 200 that is really an HTML error page, or not JSON at all, is a per-attempt failure.
fn decode_body(url: &str, body: &str) -> FetchOutcome<Value> {
    let trimmed = body.trim_start();
    let lowered = trimmed
        .get(..15)
        .unwrap_or(trimmed)
        .to_ascii_lowercase();
    if lowered.starts_with("<!doctype html") || lowered.starts_with("<html") {
        return FetchOutcome::Transient(format!(
            "unexpected HTML from {}: {}",
            url,
            excerpt(trimmed)
        ));
    }
    match serde_json::from_str(trimmed) {
        Ok(v) => FetchOutcome::Found(v),
        Err(e) => FetchOutcome::Transient(format!(
            "failed to parse JSON from {}: {} (body: {})",
            url,
            e,
            excerpt(trimmed)
        )),
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_BODY_EXCERPT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
