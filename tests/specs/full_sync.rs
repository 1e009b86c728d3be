// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::prelude::*;
use pairsync_core::{FullSyncStatus, Role};
use serde_json::json;
use std::fs;
use std::sync::Arc;

fn catalogue_of_four(data: &std::path::Path, dst_root: &std::path::Path) -> serde_json::Value {
    let files: Vec<serde_json::Value> = (0..4)
        .map(|i| {
            json!({
                "Path": data.join(format!("src{i}")),
                "DestinationPath": dst_root,
                "SyncDirection": "Active2Passive",
                "SyncType": "Immediate",
                "RetryAttempts": 1,
                "RetryInterval": "PT1S"
            })
        })
        .collect();
    json!({ "Files": files })
}

#[tokio::test]
async fn full_sync_copies_every_entry_and_completes() {
    let data = tempfile::tempdir().unwrap();
    let dst_root = data.path().join("dst");
    for i in 0..4 {
        fs::write(data.path().join(format!("src{i}")), format!("content {i}")).unwrap();
    }

    let catalog = data.path().join("catalog.d");
    write_catalog(
        &catalog,
        "sync.json",
        &catalogue_of_four(data.path(), &dst_root),
    );

    let h = harness_from_catalog(&catalog, Role::Active);
    h.engine.try_begin_full_sync().unwrap();
    Arc::clone(&h.engine).run_full_sync(h.token.clone()).await;

    assert_eq!(
        h.engine.control().full_sync_status(),
        FullSyncStatus::Completed
    );
    for i in 0..4 {
        let src = data.path().join(format!("src{i}"));
        assert_eq!(
            fs::read_to_string(mirrored(&dst_root, &src)).unwrap(),
            format!("content {i}")
        );
    }
}

#[tokio::test]
async fn one_missing_source_fails_the_full_sync_but_copies_the_rest() {
    let data = tempfile::tempdir().unwrap();
    let dst_root = data.path().join("dst");
    // src2 deliberately does not exist.
    for i in [0usize, 1, 3] {
        fs::write(data.path().join(format!("src{i}")), format!("content {i}")).unwrap();
    }

    let catalog = data.path().join("catalog.d");
    write_catalog(
        &catalog,
        "sync.json",
        &catalogue_of_four(data.path(), &dst_root),
    );

    let h = harness_from_catalog(&catalog, Role::Active);
    Arc::clone(&h.engine).run_full_sync(h.token.clone()).await;

    assert_eq!(
        h.engine.control().full_sync_status(),
        FullSyncStatus::Failed
    );
    for i in [0usize, 1, 3] {
        let src = data.path().join(format!("src{i}"));
        assert_eq!(
            fs::read_to_string(mirrored(&dst_root, &src)).unwrap(),
            format!("content {i}")
        );
    }
    assert!(!mirrored(&dst_root, &data.path().join("src2")).exists());
}
