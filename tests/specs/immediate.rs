// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::prelude::*;
use pairsync_core::{Role, SyncEventsHealth};
use serde_json::json;
use std::fs;
use std::time::Duration;

#[tokio::test]
async fn active_to_passive_file_replicates_on_write() {
    let data = tempfile::tempdir().unwrap();
    let src = data.path().join("srcA");
    let dst_root = data.path().join("dst");
    fs::write(&src, b"v0").unwrap();

    let catalog = data.path().join("catalog.d");
    write_catalog(
        &catalog,
        "sync.json",
        &json!({"Files": [{
            "Path": src,
            "DestinationPath": dst_root,
            "SyncDirection": "Active2Passive",
            "SyncType": "Immediate"
        }]}),
    );

    let h = harness_from_catalog(&catalog, Role::Active);
    h.engine.start(&h.token);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let dst = mirrored(&dst_root, &src);

    fs::write(&src, b"v1").unwrap();
    wait_for(|| fs::read(&dst).map(|d| d == b"v1").unwrap_or(false)).await;

    fs::write(&src, b"v2").unwrap();
    wait_for(|| fs::read(&dst).map(|d| d == b"v2").unwrap_or(false)).await;

    assert_eq!(
        h.engine.control().sync_events_health(),
        SyncEventsHealth::Ok
    );
}

#[tokio::test]
async fn passive_to_active_entry_does_not_transmit_from_the_active_side() {
    let data = tempfile::tempdir().unwrap();
    let src = data.path().join("srcA");
    let dst_root = data.path().join("dst");
    fs::write(&src, b"v0").unwrap();

    let catalog = data.path().join("catalog.d");
    write_catalog(
        &catalog,
        "sync.json",
        &json!({"Files": [{
            "Path": src,
            "DestinationPath": dst_root,
            "SyncDirection": "Passive2Active",
            "SyncType": "Immediate"
        }]}),
    );

    let h = harness_from_catalog(&catalog, Role::Active);
    h.engine.start(&h.token);
    tokio::time::sleep(Duration::from_millis(100)).await;

    fs::write(&src, b"v1").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(!mirrored(&dst_root, &src).exists());
}

#[tokio::test]
async fn excluded_files_stay_out_of_the_destination() {
    let data = tempfile::tempdir().unwrap();
    let src_dir = data.path().join("srcDir");
    let dst_root = data.path().join("dst");
    fs::create_dir(&src_dir).unwrap();

    let catalog = data.path().join("catalog.d");
    write_catalog(
        &catalog,
        "sync.json",
        &json!({"Directories": [{
            "Path": src_dir,
            "DestinationPath": dst_root,
            "SyncDirection": "Active2Passive",
            "SyncType": "Immediate",
            "ExcludeList": [src_dir.join("fileX")]
        }]}),
    );

    let h = harness_from_catalog(&catalog, Role::Active);
    h.engine.start(&h.token);
    tokio::time::sleep(Duration::from_millis(100)).await;

    fs::write(src_dir.join("file1"), b"a").unwrap();
    fs::write(src_dir.join("fileX"), b"b").unwrap();

    let dst_file1 = mirrored(&dst_root, &src_dir.join("file1"));
    wait_for(|| fs::read(&dst_file1).map(|d| d == b"a").unwrap_or(false)).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!mirrored(&dst_root, &src_dir.join("fileX")).exists());
}

#[tokio::test]
async fn disable_pauses_replication_and_enable_resumes_it() {
    let data = tempfile::tempdir().unwrap();
    let src = data.path().join("srcA");
    let dst_root = data.path().join("dst");
    fs::write(&src, b"v0").unwrap();

    let catalog = data.path().join("catalog.d");
    write_catalog(
        &catalog,
        "sync.json",
        &json!({"Files": [{
            "Path": src,
            "DestinationPath": dst_root,
            "SyncType": "Immediate"
        }]}),
    );

    let h = harness_from_catalog(&catalog, Role::Active);
    h.engine.start(&h.token);
    tokio::time::sleep(Duration::from_millis(100)).await;

    h.engine.control().set_disable(true);
    h.engine.disable_changed(true);
    assert_eq!(
        h.engine.control().sync_events_health(),
        SyncEventsHealth::Paused
    );

    let dst = mirrored(&dst_root, &src);
    fs::write(&src, b"hidden").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!dst.exists());

    h.engine.control().set_disable(false);
    h.engine.disable_changed(false);
    assert_eq!(
        h.engine.control().sync_events_health(),
        SyncEventsHealth::Ok
    );

    fs::write(&src, b"visible").unwrap();
    wait_for(|| fs::read(&dst).map(|d| d == b"visible").unwrap_or(false)).await;
}
