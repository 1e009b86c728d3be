// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::prelude::*;
use pairsync_core::{FullSyncStatus, Role};
use serde_json::json;
use std::fs;
use std::sync::Arc;

#[tokio::test]
async fn vanished_source_retries_from_the_nearest_existing_parent() {
    let data = tempfile::tempdir().unwrap();
    let src_dir = data.path().join("srcDir");
    let missing = src_dir.join("sub/file2.txt");
    let dst_root = data.path().join("dst");
    fs::create_dir(&src_dir).unwrap();
    fs::write(src_dir.join("file1.txt"), b"kept").unwrap();

    let catalog = data.path().join("catalog.d");
    write_catalog(
        &catalog,
        "sync.json",
        &json!({"Files": [{
            "Path": missing,
            "DestinationPath": dst_root,
            "SyncDirection": "Active2Passive",
            "SyncType": "Immediate",
            "RetryAttempts": 2,
            "RetryInterval": "PT1S"
        }]}),
    );

    let h = harness_from_catalog(&catalog, Role::Active);

    // The first invocation reports the vanished source; the handler then
    // serves the fallback transfer of the nearest existing parent.
    h.engine.transfer().push_result(
        24,
        &format!("file has vanished: \"{}\"", missing.display()),
    );

    Arc::clone(&h.engine).run_full_sync(h.token.clone()).await;

    assert_eq!(
        h.engine.control().full_sync_status(),
        FullSyncStatus::Completed
    );
    // The parent directory now exists on the destination side.
    let dst_parent = mirrored(&dst_root, &src_dir);
    assert!(dst_parent.exists());
    assert_eq!(
        fs::read_to_string(dst_parent.join("file1.txt")).unwrap(),
        "kept"
    );
}
