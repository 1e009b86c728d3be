// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::prelude::*;
use pairsync_core::Role;
use serde_json::json;
use std::fs;
use std::time::Duration;

#[tokio::test]
async fn periodic_entry_replicates_after_its_interval_not_before() {
    let data = tempfile::tempdir().unwrap();
    let src_dir = data.path().join("srcDir");
    let dst_root = data.path().join("dst");
    fs::create_dir(&src_dir).unwrap();
    fs::write(src_dir.join("f"), b"fresh").unwrap();

    let catalog = data.path().join("catalog.d");
    write_catalog(
        &catalog,
        "sync.json",
        &json!({"Directories": [{
            "Path": src_dir,
            "DestinationPath": dst_root,
            "SyncType": "Periodic",
            "Periodicity": "PT1S"
        }]}),
    );

    let h = harness_from_catalog(&catalog, Role::Active);
    h.engine.start(&h.token);

    let dst = mirrored(&dst_root, &src_dir.join("f"));

    // Not yet: the first interval has not elapsed.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!dst.exists());

    // Shortly after the interval the mirror matches.
    wait_for(|| fs::read(&dst).map(|d| d == b"fresh").unwrap_or(false)).await;
}
