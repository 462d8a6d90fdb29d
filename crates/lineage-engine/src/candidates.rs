//! Root selection from a tabular candidate list.

use anyhow::{anyhow, Context, Result};
use lineage_types::ObjectKey;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::lookup::RowKey;

/// Which rows of a candidate CSV become traversal roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFilter {
    pub snapshot_column: String,
    pub id_column: String,
    /// Keep only rows whose flag equals `flag_value`.
    pub flag_column: Option<String>,
    pub flag_value: i64,
    pub min_snapshot: Option<i64>,
    pub max_snapshot: Option<i64>,
    /// Drop repeated keys, keeping the first.
    pub dedup: bool,
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self {
            snapshot_column: "SnapNum".to_string(),
            id_column: "SubfindID".to_string(),
            flag_column: None,
            flag_value: 1,
            min_snapshot: None,
            max_snapshot: None,
            dedup: false,
        }
    }
}

impl CandidateFilter {
    fn accepts_snapshot(&self, snapshot: i64) -> bool {
        self.min_snapshot.map_or(true, |min| snapshot >= min)
            && self.max_snapshot.map_or(true, |max| snapshot <= max)
    }
}

/// Parse an integer cell. `67` and `67.0` are both accepted; empty is `None`.
pub fn parse_integer_cell(cell: &str) -> Result<Option<i64>> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(Some(i));
    }
    let f: f64 = trimmed
        .parse()
        .map_err(|_| anyhow!("'{}' is not a number", trimmed))?;
    if f.fract() != 0.0 || !f.is_finite() {
        return Err(anyhow!("'{}' is not an integer", trimmed));
    }
    Ok(Some(f as i64))
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| anyhow!("Column '{}' not found in {}", name, path.display()))
}

/// Read roots from `path`, in file order.
pub fn load_candidates(path: &Path, filter: &CandidateFilter) -> Result<Vec<ObjectKey>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to read CSV: {}", path.display()))?;
    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();

    let snap_idx = column_index(&headers, &filter.snapshot_column, path)?;
    let id_idx = column_index(&headers, &filter.id_column, path)?;
    let flag_idx = filter
        .flag_column
        .as_deref()
        .map(|name| column_index(&headers, name, path))
        .transpose()?;

    let mut seen = HashSet::new();
    let mut roots = Vec::new();
    let mut rows = 0usize;

    for (i, rec) in reader.records().enumerate() {
        let record = rec.with_context(|| {
            format!("Failed to read CSV record {} in {}", i + 1, path.display())
        })?;
        rows += 1;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        if let Some(idx) = flag_idx {
            let flag = parse_integer_cell(cell(idx))
                .with_context(|| format!("Bad flag in record {} of {}", i + 1, path.display()))?;
            if flag != Some(filter.flag_value) {
                continue;
            }
        }

        let snapshot = parse_integer_cell(cell(snap_idx))
            .with_context(|| format!("Bad snapshot in record {} of {}", i + 1, path.display()))?;
        let id = parse_integer_cell(cell(id_idx))
            .with_context(|| format!("Bad id in record {} of {}", i + 1, path.display()))?;
        let (Some(snapshot), Some(id)) = (snapshot, id) else {
            debug!(record = i + 1, "skipping row with empty key");
            continue;
        };

        if !filter.accepts_snapshot(snapshot) {
            continue;
        }
        let key = ObjectKey::new(snapshot, id);
        if filter.dedup && !seen.insert(key) {
            continue;
        }
        roots.push(key);
    }

    info!(
        path = %path.display(),
        rows,
        selected = roots.len(),
        "loaded candidate roots"
    );
    Ok(roots)
}

/// Read every row's key cells from `path`, in file order, for a field lookup.
///
/// Unlike [`load_candidates`], no row is dropped: empty or unparseable cells become
/// `None` so the lookup output stays aligned with the input table.
pub fn load_lookup_rows(path: &Path, snapshot_column: &str, id_column: &str) -> Result<Vec<RowKey>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to read CSV: {}", path.display()))?;
    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    let snap_idx = column_index(&headers, snapshot_column, path)?;
    let id_idx = column_index(&headers, id_column, path)?;

    let mut rows = Vec::new();
    for (i, rec) in reader.records().enumerate() {
        let record = rec.with_context(|| {
            format!("Failed to read CSV record {} in {}", i + 1, path.display())
        })?;
        let cell = |idx: usize| {
            let raw = record.get(idx).unwrap_or("");
            parse_integer_cell(raw).unwrap_or_else(|e| {
                debug!(record = i + 1, error = %e, "unparseable key cell");
                None
            })
        };
        rows.push(RowKey::new(cell(snap_idx), cell(id_idx)));
    }

    let incomplete = rows.iter().filter(|r| r.object_key().is_none()).count();
    info!(path = %path.display(), rows = rows.len(), incomplete, "loaded lookup rows");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_integer_cell() {
        assert_eq!(parse_integer_cell("67").unwrap(), Some(67));
        assert_eq!(parse_integer_cell(" 67.0 ").unwrap(), Some(67));
        assert_eq!(parse_integer_cell("").unwrap(), None);
        assert_eq!(parse_integer_cell("NaN").unwrap(), None);
        assert!(parse_integer_cell("67.5").is_err());
        assert!(parse_integer_cell("abc").is_err());
    }

    #[test]
    fn test_flag_and_snapshot_range() {
        let file = csv_file(
            "SnapNum,SubfindID,JellyfishFlag\n\
             99,10,1\n\
             66.0,11,1\n\
             72,12,0\n\
             72,13,1.0\n\
             100,14,1\n",
        );
        let filter = CandidateFilter {
            flag_column: Some("JellyfishFlag".to_string()),
            min_snapshot: Some(67),
            max_snapshot: Some(99),
            ..CandidateFilter::default()
        };
        let roots = load_candidates(file.path(), &filter).unwrap();
        assert_eq!(roots, vec![ObjectKey::new(99, 10), ObjectKey::new(72, 13)]);
    }

    #[test]
    fn test_dedup_keeps_first() {
        let file = csv_file("SnapNum,SubfindID\n99,1\n98,2\n99,1\n");
        let all = load_candidates(file.path(), &CandidateFilter::default()).unwrap();
        assert_eq!(all.len(), 3);

        let filter = CandidateFilter {
            dedup: true,
            ..CandidateFilter::default()
        };
        let unique = load_candidates(file.path(), &filter).unwrap();
        assert_eq!(unique, vec![ObjectKey::new(99, 1), ObjectKey::new(98, 2)]);
    }

    #[test]
    fn test_missing_column_is_error() {
        let file = csv_file("snap,id\n99,1\n");
        let err = load_candidates(file.path(), &CandidateFilter::default()).unwrap_err();
        assert!(err.to_string().contains("SnapNum"));
    }

    #[test]
    fn test_empty_key_rows_skipped() {
        let file = csv_file("SnapNum,SubfindID\n99,\n98,2\n");
        let roots = load_candidates(file.path(), &CandidateFilter::default()).unwrap();
        assert_eq!(roots, vec![ObjectKey::new(98, 2)]);
    }

    #[test]
    fn test_lookup_rows_keep_every_row() {
        let file = csv_file("snapshot,subhalo_id\n99,1\n98,\n97,3\n96,abc\n");
        let rows = load_lookup_rows(file.path(), "snapshot", "subhalo_id").unwrap();
        assert_eq!(
            rows,
            vec![
                RowKey::new(Some(99), Some(1)),
                RowKey::new(Some(98), None),
                RowKey::new(Some(97), Some(3)),
                RowKey::new(Some(96), None),
            ]
        );
    }
}
