//! Catalog records as returned by the remote service.
//!
//! ## Design Principles
//!
//! 1. **Absence is a value**: every tracked quantity is an `Option<f64>`. A field the
//!    catalog did not send and a field it sent as `null` both read back as `None`;
//!    [`ObjectRecord::has_field`] tells them apart when that matters.
//!
//! 2. **Numeric fields only**: nested objects (cutout links, `related` URLs) are not part of
//!    the field map. The one nested value we care about, the progenitor link, is lifted out
//!    into [`ProgenitorLink`] at parse time.
//!
//! 3. **Sentinel, not magic**: the catalog marks "no progenitor" with `-1`. That convention is
//!    confined to [`ProgenitorLink::is_terminal`] and [`ObjectKey::is_sentinel`].

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Reserved id meaning "no further link".
pub const SENTINEL_ID: i64 = -1;

/// Identity of one catalog entry: a snapshot number and an id inside that snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub snapshot: i64,
    pub id: i64,
}

impl ObjectKey {
    pub const fn new(snapshot: i64, id: i64) -> Self {
        Self { snapshot, id }
    }

    /// True when either component is negative. Such keys must never reach the network.
    pub fn is_sentinel(&self) -> bool {
        self.id < 0 || self.snapshot < 0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.snapshot, self.id)
    }
}

impl FromStr for ObjectKey {
    type Err = anyhow::Error;

    /// Parse `snap:id` (a comma is accepted as separator too).
    fn from_str(s: &str) -> Result<Self> {
        let (snap, id) = s
            .split_once(':')
            .or_else(|| s.split_once(','))
            .ok_or_else(|| anyhow!("expected SNAPSHOT:ID, got '{}'", s))?;
        let snapshot = snap
            .trim()
            .parse::<i64>()
            .map_err(|e| anyhow!("invalid snapshot '{}': {}", snap.trim(), e))?;
        let id = id
            .trim()
            .parse::<i64>()
            .map_err(|e| anyhow!("invalid id '{}': {}", id.trim(), e))?;
        Ok(Self { snapshot, id })
    }
}

/// Which identifier namespace a key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    /// Per-object records carrying progenitor links.
    #[default]
    Subhalo,
    /// Top-level groups (friends-of-friends halos).
    Halo,
}

impl CatalogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Subhalo => "subhalo",
            CatalogKind::Halo => "halo",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subhalo" | "subhalos" => Ok(CatalogKind::Subhalo),
            "halo" | "halos" | "group" => Ok(CatalogKind::Halo),
            other => Err(anyhow!("unknown catalog kind '{}'", other)),
        }
    }
}

/// Field names that carry the progenitor link in a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFields {
    pub snapshot_field: String,
    pub id_field: String,
}

impl Default for LinkFields {
    fn default() -> Self {
        Self {
            snapshot_field: "prog_snap".to_string(),
            id_field: "prog_sfid".to_string(),
        }
    }
}

/// Pointer from a record to its main progenitor at an earlier snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgenitorLink {
    pub snapshot: i64,
    pub id: i64,
}

impl ProgenitorLink {
    pub const fn new(snapshot: i64, id: i64) -> Self {
        Self { snapshot, id }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.snapshot, self.id)
    }

    /// True if this link carries the sentinel in either component.
    pub fn is_terminal(&self) -> bool {
        self.key().is_sentinel()
    }

    /// Extract the link from a raw record.
    ///
    /// Tries the flat link fields first, then the `related.sublink_progenitor` URL.
    /// Returns `None` when the record carries no usable link at all.
    pub fn from_json(value: &Value, fields: &LinkFields) -> Option<Self> {
        let snap = value.get(&fields.snapshot_field).and_then(json_integer);
        let id = value.get(&fields.id_field).and_then(json_integer);
        if let (Some(snapshot), Some(id)) = (snap, id) {
            return Some(Self { snapshot, id });
        }

        let url = value
            .get("related")
            .and_then(|r| r.get("sublink_progenitor"))?;
        match url {
            Value::String(s) => parse_progenitor_url(s),
            _ => None,
        }
    }
}

/// Parse `.../snapshots/{snap}/subhalos/{id}/` into a link.
///
/// `.../api/null` is how the catalog spells "no progenitor"; it maps to a terminal link.
fn parse_progenitor_url(url: &str) -> Option<ProgenitorLink> {
    let parts: Vec<&str> = url.split('/').filter(|p| !p.is_empty()).collect();
    if parts.last() == Some(&"null") {
        return Some(ProgenitorLink::new(SENTINEL_ID, SENTINEL_ID));
    }
    let snap_pos = parts.iter().position(|p| *p == "snapshots")?;
    let snapshot = parts.get(snap_pos + 1)?.parse().ok()?;
    if parts.get(snap_pos + 2) != Some(&"subhalos") {
        return None;
    }
    let id = parts.get(snap_pos + 3)?.parse().ok()?;
    Some(ProgenitorLink::new(snapshot, id))
}

fn json_integer(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f.is_finite()).then_some(f as i64)
}

fn json_number(value: &Value) -> Option<Option<f64>> {
    match value {
        Value::Null => Some(None),
        Value::Number(n) => Some(n.as_f64()),
        Value::Bool(b) => Some(Some(if *b { 1.0 } else { 0.0 })),
        _ => None,
    }
}

/// One catalog entry: numeric fields plus the progenitor link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub key: ObjectKey,
    pub fields: BTreeMap<String, Option<f64>>,
    pub progenitor: Option<ProgenitorLink>,
}

impl ObjectRecord {
    /// Empty record, mostly for building fixtures.
    pub fn new(key: ObjectKey) -> Self {
        Self {
            key,
            fields: BTreeMap::new(),
            progenitor: None,
        }
    }

    pub fn with_field(mut self, name: &str, value: Option<f64>) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn with_progenitor(mut self, snapshot: i64, id: i64) -> Self {
        self.progenitor = Some(ProgenitorLink::new(snapshot, id));
        self
    }

    /// Build a record from a catalog JSON body.
    pub fn from_json(key: ObjectKey, value: &Value, link_fields: &LinkFields) -> Result<Self> {
        let Some(map) = value.as_object() else {
            bail!("expected a JSON object for {}, got {}", key, type_name(value));
        };

        let fields = map
            .iter()
            .filter_map(|(name, v)| json_number(v).map(|n| (name.clone(), n)))
            .collect();

        Ok(Self {
            key,
            fields,
            progenitor: ProgenitorLink::from_json(value, link_fields),
        })
    }

    /// Value of a field; `None` when absent or null.
    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied().flatten()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Values for `names`, in the given order.
    pub fn select(&self, names: &[String]) -> Vec<Option<f64>> {
        names.iter().map(|n| self.field(n)).collect()
    }

    /// The link to follow next, or `None` if the chain ends here.
    pub fn next_link(&self) -> Option<ProgenitorLink> {
        self.progenitor.filter(|l| !l.is_terminal())
    }
}

/// Per-snapshot metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub snapshot: i64,
    pub redshift: f64,
}

impl SnapshotMeta {
    pub fn from_json(snapshot: i64, value: &Value) -> Result<Self> {
        let redshift = value
            .get("redshift")
            .and_then(Value::as_f64)
            .ok_or_else(|| anyhow!("snapshot {} metadata has no numeric redshift", snapshot))?;
        Ok(Self { snapshot, redshift })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
