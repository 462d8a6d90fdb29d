//! End-to-end engine behavior against a deterministic in-memory catalog.

use lineage_engine::{
    scan_max, traverse, write_batch, BatchConfig, BatchOrchestrator, BatchOutcome, Boundary,
    FetchStage, RetryPolicy, ScanConfig, ScanEnd, Termination, TraversalConfig,
};
use lineage_transport::test_utils::{MockCall, MockResolver};
use lineage_transport::FetchOutcome;
use lineage_types::{CatalogKind, ObjectKey, ObjectRecord, RetryConfig};
use std::sync::Arc;
use tempfile::TempDir;

const FIELDS: [&str; 2] = ["mass_stars", "sfr"];

fn fields() -> Vec<String> {
    FIELDS.iter().map(|s| s.to_string()).collect()
}

/// Linear history `(top, id) -> (top-1, id+1) -> …` down to `bottom`, whose link is the sentinel.
fn linear_history(mock: MockResolver, top: i64, bottom: i64, id: i64) -> MockResolver {
    let mut mock = mock;
    for (step, snap) in (bottom..=top).rev().enumerate() {
        let this_id = id + step as i64;
        let mut rec = ObjectRecord::new(ObjectKey::new(snap, this_id))
            .with_field("mass_stars", Some(snap as f64 * 0.5))
            .with_field("sfr", if snap % 2 == 0 { Some(1.0) } else { None });
        rec = if snap == bottom {
            rec.with_progenitor(-1, -1)
        } else {
            rec.with_progenitor(snap - 1, this_id + 1)
        };
        mock = mock.with_subhalo(rec);
    }
    mock
}

fn quick_policy(attempts: usize) -> RetryPolicy {
    RetryPolicy::new(RetryConfig::immediate(attempts))
}

#[test]
fn test_series_columns_are_aligned() {
    let mock = linear_history(MockResolver::new().with_redshift_range(80, 99), 99, 90, 100);
    let config = TraversalConfig::new(fields());
    let report = traverse(&mock, &quick_policy(3), &config, ObjectKey::new(99, 100));

    assert_eq!(
        report.termination,
        Termination::BoundaryReached(Boundary::Sentinel)
    );
    assert_eq!(report.series.len(), 10);
    assert!(report.series.is_aligned());
    for field in FIELDS {
        assert_eq!(
            report.series.column(field).unwrap().len(),
            report.series.redshift().len()
        );
    }
    // Oldest first.
    assert_eq!(report.series.snapshots().first(), Some(&90));
    assert_eq!(report.series.snapshots().last(), Some(&99));
    assert_eq!(report.series.redshift().last(), Some(&Some(0.0)));
}

#[test]
fn test_reversal_reproduces_visit_order() {
    let mock = linear_history(MockResolver::new().with_redshift_range(90, 99), 99, 95, 0);
    let config = TraversalConfig::new(fields());
    let report = traverse(&mock, &quick_policy(1), &config, ObjectKey::new(99, 0));

    let visited: Vec<ObjectKey> = mock
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            MockCall::Object(_, key) => Some(key),
            MockCall::Snapshot(_) => None,
        })
        .collect();
    assert_eq!(report.series.clone().into_chain().visit_order(), visited);
}

#[test]
fn test_rerun_is_byte_identical() {
    let mock = linear_history(MockResolver::new().with_redshift_range(60, 99), 99, 70, 7);
    let config = TraversalConfig::new(fields());
    let policy = quick_policy(3);

    let first = traverse(&mock, &policy, &config, ObjectKey::new(99, 7));
    let second = traverse(&mock, &policy, &config, ObjectKey::new(99, 7));
    assert_eq!(
        serde_json::to_vec(&first.series).unwrap(),
        serde_json::to_vec(&second.series).unwrap()
    );
}

#[test]
fn test_sentinel_progenitor_yields_single_sample() {
    let root = ObjectKey::new(99, 3);
    let mock = MockResolver::new().with_redshift(99, 0.0).with_subhalo(
        ObjectRecord::new(root)
            .with_field("mass_stars", Some(9.0))
            .with_progenitor(-1, -1),
    );
    let report = traverse(
        &mock,
        &quick_policy(3),
        &TraversalConfig::new(fields()),
        root,
    );
    assert_eq!(report.series.len(), 1);
    assert_eq!(report.series.column("mass_stars").unwrap(), &[Some(9.0)]);
    assert_eq!(report.series.column("sfr").unwrap(), &[None]);
}

#[test]
fn test_retry_exhaustion_keeps_partial_chain() {
    let broken = ObjectKey::new(97, 2);
    let mock = linear_history(MockResolver::new().with_redshift_range(90, 99), 99, 90, 0)
        .with_object_script(
            CatalogKind::Subhalo,
            broken,
            vec![FetchOutcome::Transient("read timed out".into())],
        );
    let report = traverse(
        &mock,
        &quick_policy(4),
        &TraversalConfig::new(fields()),
        ObjectKey::new(99, 0),
    );

    assert_eq!(mock.object_calls(broken), 4);
    assert_eq!(
        report.termination,
        Termination::FetchFailed {
            key: broken,
            stage: FetchStage::Object,
            error: "read timed out".to_string(),
            attempts: 4,
        }
    );
    assert_eq!(report.series.snapshots(), &[98, 99]);
    assert!(!report.is_root_failure());
}

#[test]
fn test_retry_sleeps_between_attempts() {
    let slept = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let log = Arc::clone(&slept);
    let policy = RetryPolicy::new(RetryConfig::new(3, 2000)).with_sleeper(move |d| log.lock().push(d));
    let root = ObjectKey::new(99, 1);
    let mock = MockResolver::new().with_object_script(
        CatalogKind::Subhalo,
        root,
        vec![FetchOutcome::Transient("503".into())],
    );

    let report = traverse(&mock, &policy, &TraversalConfig::new(fields()), root);
    assert!(report.is_root_failure());
    assert_eq!(slept.lock().len(), 2);
    assert!(slept
        .lock()
        .iter()
        .all(|d| *d == std::time::Duration::from_secs(2)));
}

#[test]
fn test_metadata_failure_pads_redshift() {
    let mock = linear_history(MockResolver::new().with_redshift_range(95, 99), 99, 90, 0)
        .with_snapshot_script(97, vec![FetchOutcome::Transient("HTTP 502".into())]);
    let report = traverse(
        &mock,
        &quick_policy(2),
        &TraversalConfig::new(fields()),
        ObjectKey::new(99, 0),
    );

    assert_eq!(report.series.snapshots(), &[97, 98, 99]);
    assert_eq!(report.series.redshift()[0], None);
    assert!(report.series.redshift()[1].is_some());
    assert!(report.series.column("mass_stars").unwrap()[0].is_some());
    assert!(matches!(
        report.termination,
        Termination::FetchFailed {
            stage: FetchStage::SnapshotMeta,
            attempts: 2,
            ..
        }
    ));
    assert_eq!(mock.snapshot_calls(97), 2);
}

#[test]
fn test_floor_stops_before_fetch() {
    let mock = linear_history(MockResolver::new().with_redshift_range(60, 99), 99, 60, 0);
    let config = TraversalConfig::new(fields()).with_floor(67);
    let report = traverse(&mock, &quick_policy(1), &config, ObjectKey::new(99, 0));

    assert_eq!(report.series.len(), 33);
    assert_eq!(report.series.snapshots()[0], 67);
    assert_eq!(
        report.termination,
        Termination::BoundaryReached(Boundary::SnapshotFloor {
            snapshot: 66,
            floor: 67
        })
    );
    assert_eq!(mock.object_calls(ObjectKey::new(66, 33)), 0);
}

#[test]
fn test_non_monotonic_link_ends_chain() {
    let a = ObjectKey::new(50, 1);
    let b = ObjectKey::new(49, 2);
    let mock = MockResolver::new()
        .with_redshift_range(40, 50)
        .with_subhalo(ObjectRecord::new(a).with_progenitor(49, 2))
        .with_subhalo(ObjectRecord::new(b).with_progenitor(50, 1));
    let report = traverse(&mock, &quick_policy(1), &TraversalConfig::new(fields()), a);

    assert_eq!(report.series.len(), 2);
    assert_eq!(
        report.termination,
        Termination::NonMonotonicLink { from: b, to: a }
    );
    assert_eq!(mock.object_calls(a), 1);
}

#[test]
fn test_scan_stops_at_first_missing_index() {
    let mut mock = MockResolver::new();
    for i in 0..42 {
        let mass = if i == 17 { 1.0e4 } else { (i % 7) as f64 * 10.0 };
        mock = mock.with_record(
            CatalogKind::Halo,
            ObjectRecord::new(ObjectKey::new(99, i)).with_field("Group_M_Crit200", Some(mass)),
        );
    }
    let report = scan_max(
        &mock,
        &quick_policy(3),
        99,
        &ScanConfig::new("Group_M_Crit200"),
    );

    assert_eq!(mock.total_calls(), 43);
    assert_eq!(report.probes, 43);
    assert_eq!(report.entries, 42);
    assert_eq!(report.end, ScanEnd::NotFound { index: 42 });
    assert_eq!(report.max_value, 1.0e4);
    assert_eq!(report.max_index, Some(17));
    assert!(report.skipped.is_empty());
}

fn three_root_mock() -> MockResolver {
    let mock = MockResolver::new().with_redshift_range(90, 99);
    let mock = linear_history(mock, 99, 95, 10);
    let mock = linear_history(mock, 99, 97, 30);
    mock.with_object_script(
        CatalogKind::Subhalo,
        ObjectKey::new(99, 20),
        vec![FetchOutcome::Transient("connection reset".into())],
    )
}

#[test]
fn test_batch_isolates_failures() {
    let roots = [
        ObjectKey::new(99, 10),
        ObjectKey::new(99, 20),
        ObjectKey::new(99, 30),
    ];
    let config = BatchConfig::new(TraversalConfig::new(fields())).with_retry(RetryConfig::immediate(3));
    let orchestrator = BatchOrchestrator::new(three_root_mock(), config);
    let result = orchestrator.run(&roots).unwrap();

    assert_eq!(result.entries.len(), 3);
    assert_eq!(result.entries[0].report().unwrap().series.len(), 5);
    assert_eq!(result.entries[2].report().unwrap().series.len(), 3);
    match &result.entries[1].outcome {
        BatchOutcome::Failed(failure) => {
            assert!(failure.error.contains("connection reset"));
            assert_eq!(failure.object_attempts, 3);
        }
        other => panic!("expected failure for second root, got {:?}", other),
    }
    assert_eq!(orchestrator.resolver().object_calls(ObjectKey::new(99, 20)), 3);

    let summary = result.summary();
    assert_eq!((summary.completed, summary.failed), (2, 1));
    assert_eq!(summary.metrics.failed_fetches, 1);
}

#[test]
fn test_parallel_batch_preserves_input_order() {
    let roots = [
        ObjectKey::new(99, 30),
        ObjectKey::new(99, 20),
        ObjectKey::new(99, 10),
        ObjectKey::new(99, 99),
    ];
    let sequential = BatchOrchestrator::new(
        three_root_mock(),
        BatchConfig::new(TraversalConfig::new(fields())).with_retry(RetryConfig::immediate(2)),
    )
    .run(&roots)
    .unwrap();
    let parallel = BatchOrchestrator::new(
        three_root_mock(),
        BatchConfig::new(TraversalConfig::new(fields()))
            .with_retry(RetryConfig::immediate(2))
            .with_parallelism(4),
    )
    .run(&roots)
    .unwrap();

    let order: Vec<ObjectKey> = parallel.entries.iter().map(|e| e.root).collect();
    assert_eq!(order, roots.to_vec());
    assert_eq!(sequential.entries, parallel.entries);
}

#[test]
fn test_write_batch_outputs() {
    let roots = [
        ObjectKey::new(99, 10),
        ObjectKey::new(99, 20),
        ObjectKey::new(99, -1),
    ];
    let config = BatchConfig::new(TraversalConfig::new(fields())).with_retry(RetryConfig::immediate(1));
    let result = BatchOrchestrator::new(three_root_mock(), config)
        .run(&roots)
        .unwrap();

    let dir = TempDir::new().unwrap();
    let written = write_batch(dir.path(), &result).unwrap();
    assert_eq!(written.len(), 2);

    let csv = std::fs::read_to_string(dir.path().join("root_99_10.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("snapshot,object_id,redshift,mass_stars,sfr")
    );
    assert_eq!(lines.count(), 5);
    assert!(!dir.path().join("root_99_20.csv").exists());

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("summary.json")).unwrap())
            .unwrap();
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["empty"], 1);
    assert_eq!(summary["roots"][1]["status"], "failed");
}
