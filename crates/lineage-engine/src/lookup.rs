//! One-field lookups for a list of keys (no traversal).

use lineage_transport::RecordResolver;
use lineage_types::{CatalogKind, ObjectKey};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::retry::{RetryOutcome, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStatus {
    Found,
    /// The record exists but does not carry the field.
    FieldMissing,
    NotFound,
    Failed(String),
    /// The input row has an empty or unparseable snapshot or id.
    MissingKey,
    /// The key is the no-object sentinel; nothing was fetched.
    InvalidKey,
}

impl LookupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupStatus::Found => "found",
            LookupStatus::FieldMissing => "field_missing",
            LookupStatus::NotFound => "not_found",
            LookupStatus::Failed(_) => "failed",
            LookupStatus::MissingKey => "missing_key",
            LookupStatus::InvalidKey => "invalid_key",
        }
    }
}

/// One input row's key cells, either of which may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowKey {
    pub snapshot: Option<i64>,
    pub id: Option<i64>,
}

impl RowKey {
    pub fn new(snapshot: Option<i64>, id: Option<i64>) -> Self {
        Self { snapshot, id }
    }

    pub fn object_key(&self) -> Option<ObjectKey> {
        Some(ObjectKey::new(self.snapshot?, self.id?))
    }
}

impl From<ObjectKey> for RowKey {
    fn from(key: ObjectKey) -> Self {
        Self::new(Some(key.snapshot), Some(key.id))
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string());
        write!(f, "{}:{}", cell(self.snapshot), cell(self.id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupRow {
    pub key: RowKey,
    pub value: Option<f64>,
    pub status: LookupStatus,
}

/// Fetch `field` for each row, sequentially and in input order. Never aborts.
///
/// Every input row yields exactly one output row. Rows without a complete key, or
/// whose key is the sentinel, are reported without touching the resolver.
pub fn lookup_fields<R: RecordResolver + ?Sized>(
    resolver: &R,
    policy: &RetryPolicy,
    kind: CatalogKind,
    rows: &[RowKey],
    field: &str,
) -> Vec<LookupRow> {
    let out: Vec<LookupRow> = rows
        .iter()
        .map(|&row| {
            let Some(key) = row.object_key() else {
                debug!(row = %row, "lookup row has no key");
                return LookupRow {
                    key: row,
                    value: None,
                    status: LookupStatus::MissingKey,
                };
            };
            if key.is_sentinel() {
                debug!(key = %key, "lookup row holds the sentinel");
                return LookupRow {
                    key: row,
                    value: None,
                    status: LookupStatus::InvalidKey,
                };
            }
            let fetched = policy.run(|| resolver.fetch_object(kind, key));
            let (value, status) = match fetched.outcome {
                RetryOutcome::Found(record) if record.has_field(field) => {
                    (record.field(field), LookupStatus::Found)
                }
                RetryOutcome::Found(_) => (None, LookupStatus::FieldMissing),
                RetryOutcome::NotFound => (None, LookupStatus::NotFound),
                RetryOutcome::FetchFailed { last_error } => {
                    warn!(key = %key, error = %last_error, "lookup failed");
                    (None, LookupStatus::Failed(last_error))
                }
            };
            LookupRow {
                key: row,
                value,
                status,
            }
        })
        .collect();

    let found = out
        .iter()
        .filter(|r| r.status == LookupStatus::Found)
        .count();
    info!(field, rows = out.len(), found, "lookup complete");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_transport::test_utils::MockResolver;
    use lineage_transport::FetchOutcome;
    use lineage_types::{ObjectRecord, RetryConfig};

    #[test]
    fn test_lookup_statuses_in_order() {
        let mock = MockResolver::new()
            .with_subhalo(ObjectRecord::new(ObjectKey::new(99, 1)).with_field("GroupNumber", Some(4.0)))
            .with_subhalo(ObjectRecord::new(ObjectKey::new(99, 2)).with_field("mass", Some(1.0)))
            .with_subhalo(ObjectRecord::new(ObjectKey::new(99, 3)).with_field("GroupNumber", None))
            .with_object_script(
                CatalogKind::Subhalo,
                ObjectKey::new(99, 4),
                vec![FetchOutcome::Transient("timeout".into())],
            );
        let policy = RetryPolicy::new(RetryConfig::immediate(2));
        let keys: Vec<RowKey> = (1..=5).map(|i| ObjectKey::new(99, i).into()).collect();

        let rows = lookup_fields(&mock, &policy, CatalogKind::Subhalo, &keys, "GroupNumber");
        let statuses: Vec<&str> = rows.iter().map(|r| r.status.as_str()).collect();
        assert_eq!(
            statuses,
            vec!["found", "field_missing", "found", "failed", "not_found"]
        );
        assert_eq!(rows[0].value, Some(4.0));
        assert_eq!(rows[2].value, None);
        assert_eq!(rows[3].status, LookupStatus::Failed("timeout".to_string()));
        assert_eq!(mock.object_calls(ObjectKey::new(99, 4)), 2);
    }

    #[test]
    fn test_sentinel_and_missing_keys_skip_fetch() {
        let mock = MockResolver::new()
            .with_subhalo(ObjectRecord::new(ObjectKey::new(97, 3)).with_field("GroupNumber", Some(2.0)));
        let policy = RetryPolicy::new(RetryConfig::new(3, 2000))
            .with_sleeper(|_| panic!("no retry expected"));
        let rows = vec![
            RowKey::new(Some(99), Some(-1)),
            RowKey::new(Some(98), None),
            RowKey::new(Some(97), Some(3)),
        ];

        let out = lookup_fields(&mock, &policy, CatalogKind::Subhalo, &rows, "GroupNumber");
        let statuses: Vec<&str> = out.iter().map(|r| r.status.as_str()).collect();
        assert_eq!(statuses, vec!["invalid_key", "missing_key", "found"]);
        assert_eq!(out[1].key, RowKey::new(Some(98), None));
        assert_eq!(out[1].value, None);
        assert_eq!(mock.object_calls(ObjectKey::new(99, -1)), 0);
        assert_eq!(mock.total_calls(), 1);
    }
}
