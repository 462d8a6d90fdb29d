//! Test utilities for catalog resolvers.
//!
//! - [`MockResolver`]: deterministic in-memory catalog with scripted replies and a call log
//! - [`StubCatalog`]: a tiny HTTP server on `127.0.0.1` for exercising [`CatalogClient`](crate::CatalogClient)
//!   against real status codes and bodies
//!
//! Enabled for this crate's own tests and, for other crates, through the `test-utils` feature.

use lineage_types::{CatalogKind, ObjectKey, ObjectRecord, SnapshotMeta};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;

use crate::resolver::{FetchOutcome, RecordResolver};

/// Replies played back for one key. The last reply repeats forever.
#[derive(Debug)]
struct Script<T> {
    replies: Vec<FetchOutcome<T>>,
    cursor: usize,
}

impl<T: Clone> Script<T> {
    fn next(&mut self) -> FetchOutcome<T> {
        let idx = self.cursor.min(self.replies.len().saturating_sub(1));
        self.cursor += 1;
        self.replies
            .get(idx)
            .cloned()
            .unwrap_or(FetchOutcome::NotFound)
    }
}

/// One call observed by [`MockResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCall {
    Object(CatalogKind, ObjectKey),
    Snapshot(i64),
}

/// In-memory resolver. Unknown keys answer `NotFound`.
#[derive(Default)]
pub struct MockResolver {
    objects: Mutex<HashMap<(CatalogKind, ObjectKey), Script<ObjectRecord>>>,
    snapshots: Mutex<HashMap<i64, Script<SnapshotMeta>>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `record` under its own key, every time.
    pub fn with_record(self, kind: CatalogKind, record: ObjectRecord) -> Self {
        let key = record.key;
        self.with_object_script(kind, key, vec![FetchOutcome::Found(record)])
    }

    pub fn with_subhalo(self, record: ObjectRecord) -> Self {
        self.with_record(CatalogKind::Subhalo, record)
    }

    pub fn with_object_script(
        self,
        kind: CatalogKind,
        key: ObjectKey,
        replies: Vec<FetchOutcome<ObjectRecord>>,
    ) -> Self {
        self.objects
            .lock()
            .insert((kind, key), Script { replies, cursor: 0 });
        self
    }

    pub fn with_redshift(self, snapshot: i64, redshift: f64) -> Self {
        self.with_snapshot_script(
            snapshot,
            vec![FetchOutcome::Found(SnapshotMeta { snapshot, redshift })],
        )
    }

    /// Redshifts for every snapshot in `first..=last`, decreasing towards `last` (z = 0).
    pub fn with_redshift_range(mut self, first: i64, last: i64) -> Self {
        for snap in first..=last {
            let z = (last - snap) as f64 * 0.05;
            self = self.with_redshift(snap, z);
        }
        self
    }

    pub fn with_snapshot_script(self, snapshot: i64, replies: Vec<FetchOutcome<SnapshotMeta>>) -> Self {
        self.snapshots
            .lock()
            .insert(snapshot, Script { replies, cursor: 0 });
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Calls made for one object key, in any namespace.
    pub fn object_calls(&self, key: ObjectKey) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, MockCall::Object(_, k) if *k == key))
            .count()
    }

    pub fn snapshot_calls(&self, snapshot: i64) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, MockCall::Snapshot(s) if *s == snapshot))
            .count()
    }
}

impl RecordResolver for MockResolver {
    fn fetch_object(&self, kind: CatalogKind, key: ObjectKey) -> FetchOutcome<ObjectRecord> {
        self.calls.lock().push(MockCall::Object(kind, key));
        match self.objects.lock().get_mut(&(kind, key)) {
            Some(script) => script.next(),
            None => FetchOutcome::NotFound,
        }
    }

    fn fetch_snapshot_meta(&self, snapshot: i64) -> FetchOutcome<SnapshotMeta> {
        self.calls.lock().push(MockCall::Snapshot(snapshot));
        match self.snapshots.lock().get_mut(&snapshot) {
            Some(script) => script.next(),
            None => FetchOutcome::NotFound,
        }
    }
}

/// Canned HTTP response served by [`StubCatalog`].
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

/// One request received by [`StubCatalog`].
#[derive(Debug, Clone)]
pub struct StubHit {
    pub path: String,
    pub api_key: Option<String>,
}

/// Minimal HTTP/1.1 server answering GETs from a route table.
///
/// Unrouted paths answer `404`. The accept thread lives until the process exits.
pub struct StubCatalog {
    addr: SocketAddr,
    routes: Arc<Mutex<HashMap<String, StubResponse>>>,
    hits: Arc<Mutex<Vec<StubHit>>>,
}

impl StubCatalog {
    pub fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let routes: Arc<Mutex<HashMap<String, StubResponse>>> = Arc::default();
        let hits: Arc<Mutex<Vec<StubHit>>> = Arc::default();

        let thread_routes = Arc::clone(&routes);
        let thread_hits = Arc::clone(&hits);
        std::thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                // A broken client connection only affects that request.
                let _ = serve_one(stream, &thread_routes, &thread_hits);
            }
        });

        Ok(Self { addr, routes, hits })
    }

    /// API root to hand to `CatalogConfig::new`.
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn route(&self, path: &str, status: u16, content_type: &str, body: &str) {
        self.routes.lock().insert(
            path.to_string(),
            StubResponse {
                status,
                content_type: content_type.to_string(),
                body: body.to_string(),
            },
        );
    }

    pub fn json(&self, path: &str, body: &serde_json::Value) {
        self.route(path, 200, "application/json", &body.to_string());
    }

    pub fn hits(&self) -> Vec<StubHit> {
        self.hits.lock().clone()
    }

    pub fn hit_count(&self, path: &str) -> usize {
        self.hits.lock().iter().filter(|h| h.path == path).count()
    }
}

fn serve_one(
    stream: TcpStream,
    routes: &Mutex<HashMap<String, StubResponse>>,
    hits: &Mutex<Vec<StubHit>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();

    let mut api_key = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("api-key") {
                api_key = Some(value.trim().to_string());
            }
        }
    }

    hits.lock().push(StubHit {
        path: path.clone(),
        api_key,
    });

    let response = routes.lock().get(&path).cloned().unwrap_or(StubResponse {
        status: 404,
        content_type: "text/plain".to_string(),
        body: "Not found.".to_string(),
    });

    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        reason_phrase(response.status),
        response.content_type,
        response.body.len(),
        response.body
    )?;
    stream.flush()
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_repeats_last_reply() {
        let key = ObjectKey::new(10, 1);
        let rec = ObjectRecord::new(key);
        let mock = MockResolver::new().with_object_script(
            CatalogKind::Subhalo,
            key,
            vec![
                FetchOutcome::Transient("flaky".into()),
                FetchOutcome::Found(rec.clone()),
            ],
        );
        assert!(matches!(
            mock.fetch_object(CatalogKind::Subhalo, key),
            FetchOutcome::Transient(_)
        ));
        assert_eq!(mock.fetch_object(CatalogKind::Subhalo, key), FetchOutcome::Found(rec.clone()));
        assert_eq!(mock.fetch_object(CatalogKind::Subhalo, key), FetchOutcome::Found(rec));
        assert_eq!(mock.object_calls(key), 3);
    }

    #[test]
    fn test_unknown_keys_not_found() {
        let mock = MockResolver::new().with_redshift_range(98, 99);
        assert_eq!(
            mock.fetch_object(CatalogKind::Halo, ObjectKey::new(1, 1)),
            FetchOutcome::NotFound
        );
        assert_eq!(mock.fetch_snapshot_meta(50), FetchOutcome::NotFound);
        assert_eq!(
            mock.fetch_snapshot_meta(98),
            FetchOutcome::Found(SnapshotMeta { snapshot: 98, redshift: 0.05 })
        );
        assert_eq!(mock.total_calls(), 3);
    }
}
