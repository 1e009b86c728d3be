// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeMap;
use tempfile::tempdir;

#[test]
fn writes_record_with_details() {
    let dir = tempdir().unwrap();
    let reporter = ErrorReporter::new(dir.path());

    let mut details = BTreeMap::new();
    details.insert("Path".to_string(), "/srv/data".to_string());

    let path = reporter
        .report("TransferFailed", "transfer exhausted retries", details, None)
        .unwrap();

    let body: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(body["Kind"], "TransferFailed");
    assert_eq!(body["Message"], "transfer exhausted retries");
    assert_eq!(body["Details"]["Path"], "/srv/data");
    assert!(body.get("CaptureFile").is_none());
}

#[test]
fn capture_output_lands_in_side_file() {
    let dir = tempdir().unwrap();
    let reporter = ErrorReporter::new(dir.path());

    let path = reporter
        .report(
            "TransferFailed",
            "boom",
            BTreeMap::new(),
            Some("rsync: connection refused"),
        )
        .unwrap();

    let body: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let capture = body["CaptureFile"].as_str().unwrap();
    assert_eq!(
        std::fs::read_to_string(capture).unwrap(),
        "rsync: connection refused"
    );
}

#[test]
fn report_names_are_unique() {
    let dir = tempdir().unwrap();
    let reporter = ErrorReporter::new(dir.path());
    let a = reporter
        .report("K", "m", BTreeMap::new(), None)
        .unwrap();
    let b = reporter
        .report("K", "m", BTreeMap::new(), None)
        .unwrap();
    assert_ne!(a, b);
}

#[test]
fn unwritable_directory_only_logs() {
    let reporter = ErrorReporter::new(std::path::Path::new("/proc/definitely/not/writable"));
    assert!(reporter
        .report("K", "m", BTreeMap::new(), None)
        .is_none());
}
