//! The remote-fetch contract shared by every caller.

use lineage_types::{CatalogKind, ObjectKey, ObjectRecord, SnapshotMeta};
use serde::Serialize;
use std::sync::Arc;

/// Result of a single, unretried catalog request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FetchOutcome<T> {
    /// Well-formed response.
    Found(T),
    /// The catalog says the resource does not exist (HTTP 404). Authoritative.
    NotFound,
    /// Transport failure, timeout, unexpected status or malformed body. Retryable.
    Transient(String),
}

impl<T> FetchOutcome<T> {
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Found(v) => FetchOutcome::Found(f(v)),
            FetchOutcome::NotFound => FetchOutcome::NotFound,
            FetchOutcome::Transient(e) => FetchOutcome::Transient(e),
        }
    }

    /// Parse a found value; a parse error becomes `Transient`.
    pub fn parse<U, F: FnOnce(T) -> anyhow::Result<U>>(self, f: F) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Found(v) => match f(v) {
                Ok(u) => FetchOutcome::Found(u),
                Err(e) => FetchOutcome::Transient(format!("{:#}", e)),
            },
            FetchOutcome::NotFound => FetchOutcome::NotFound,
            FetchOutcome::Transient(e) => FetchOutcome::Transient(e),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, FetchOutcome::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            FetchOutcome::Found(v) => Some(v),
            _ => None,
        }
    }
}

/// Single point of contact with the catalog.
///
/// Implementations must be usable from several threads at once; unrelated chains may be
/// walked concurrently against one resolver.
pub trait RecordResolver: Send + Sync {
    /// Fetch one record. Callers never pass sentinel keys.
    fn fetch_object(&self, kind: CatalogKind, key: ObjectKey) -> FetchOutcome<ObjectRecord>;

    /// Fetch snapshot metadata (redshift).
    fn fetch_snapshot_meta(&self, snapshot: i64) -> FetchOutcome<SnapshotMeta>;
}

impl<R: RecordResolver + ?Sized> RecordResolver for &R {
    fn fetch_object(&self, kind: CatalogKind, key: ObjectKey) -> FetchOutcome<ObjectRecord> {
        (**self).fetch_object(kind, key)
    }

    fn fetch_snapshot_meta(&self, snapshot: i64) -> FetchOutcome<SnapshotMeta> {
        (**self).fetch_snapshot_meta(snapshot)
    }
}

impl<R: RecordResolver + ?Sized> RecordResolver for Arc<R> {
    fn fetch_object(&self, kind: CatalogKind, key: ObjectKey) -> FetchOutcome<ObjectRecord> {
        (**self).fetch_object(kind, key)
    }

    fn fetch_snapshot_meta(&self, snapshot: i64) -> FetchOutcome<SnapshotMeta> {
        (**self).fetch_snapshot_meta(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_parse_error_becomes_transient() {
        let out: FetchOutcome<u32> =
            FetchOutcome::Found("abc").parse(|_| Err(anyhow!("bad body")));
        assert_eq!(out, FetchOutcome::Transient("bad body".to_string()));

        let nf: FetchOutcome<u32> = FetchOutcome::<&str>::NotFound.parse(|_| Ok(1));
        assert_eq!(nf, FetchOutcome::NotFound);
    }

    #[test]
    fn test_map_and_found() {
        let out = FetchOutcome::Found(2).map(|v| v * 10);
        assert!(out.is_found());
        assert_eq!(out.found(), Some(20));
        assert_eq!(FetchOutcome::<u8>::Transient("x".into()).found(), None);
    }
}
