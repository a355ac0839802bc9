//! Ingestion and output round-trips over real files.

use std::fs;

use tempfile::tempdir;

use pivotk::io;
use pivotk::Error;

#[test]
fn reads_weights_with_spaces_and_tabs_around_commas() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("weights.csv");
    fs::write(&path, "1.0, -2.5\t,3.0\n\t0.25 ,0.5,  -0.125\n").unwrap();

    let weights = io::read_weights_csv(&path, 2, 3).unwrap();
    assert_eq!(weights, vec![1.0, -2.5, 3.0, 0.25, 0.5, -0.125]);
}

#[test]
fn rejects_rows_with_wrong_column_count() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("weights.csv");
    fs::write(&path, "1.0,2.0\n3.0\n").unwrap();

    let err = io::read_weights_csv(&path, 2, 2).unwrap_err();
    match err {
        Error::Parse { line, .. } => assert_eq!(line, 2),
        other => panic!("expected a parse error, got {other}"),
    }
}

#[test]
fn rejects_truncated_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("weights.csv");
    fs::write(&path, "1.0,2.0\n").unwrap();

    let err = io::read_weights_csv(&path, 3, 2).unwrap_err();
    assert!(matches!(err, Error::Parse { line: 2, .. }));
}

#[test]
fn rejects_non_numeric_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("weights.csv");
    fs::write(&path, "1.0,abc\n").unwrap();

    let err = io::read_weights_csv(&path, 1, 2).unwrap_err();
    assert!(matches!(err, Error::Parse { line: 1, .. }));
}

#[test]
fn missing_files_surface_the_path() {
    let err = io::read_weights_csv("no/such/file.csv".as_ref(), 1, 1).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert!(err.to_string().contains("no/such/file.csv"));
}

#[test]
fn reads_ids_and_skips_blank_lines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("assignments.csv");
    fs::write(&path, "0\n2\n\n1\n\n").unwrap();

    let ids = io::read_ids_csv(&path, 3).unwrap();
    assert_eq!(ids, vec![0, 2, 1]);
}

#[test]
fn rejects_id_count_mismatch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("assignments.csv");
    fs::write(&path, "0\n1\n").unwrap();

    let err = io::read_ids_csv(&path, 3).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
}

#[test]
fn writes_top_k_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("topk.csv");

    io::write_top_k_csv(&path, &[3, 1, 4, 1, 5, 9], 3).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "3,1,4\n1,5,9\n");
}

#[test]
fn writes_user_stats_with_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stats.csv");

    let stats = vec![pivotk::UserStats {
        cluster_id: 2,
        user_id: 17,
        theta_uc: 0.25,
        theta_max: 0.5,
        items_visited: 42,
        user_micros: 7,
    }];
    io::write_user_stats_csv(&path, &stats).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "cluster_id,user_id,theta_uc,theta_max,items_visited,user_micros"
    );
    assert_eq!(lines.next().unwrap(), "2,17,0.25,0.5,42,7");
}
