// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pairsync_core::{FullSyncStatus, SyncEventsHealth};
use pairsync_engine::{ControlState, ControlSnapshot};
use std::fs;
use tempfile::tempdir;

#[test]
fn pre_written_snapshot_restores_all_three_properties() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("control.json");
    fs::write(
        &path,
        r#"{"Disable": true, "FullSyncStatus": 1, "SyncEventsHealth": 2}"#,
    )
    .unwrap();

    let control = ControlState::restore(&path);
    assert!(control.disable());
    assert_eq!(control.full_sync_status(), FullSyncStatus::InProgress);
    assert_eq!(control.sync_events_health(), SyncEventsHealth::Critical);
}

#[test]
fn properties_survive_a_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("control.json");

    {
        let control = ControlState::restore(&path);
        control.set_disable(true);
        control.set_full_sync_status(FullSyncStatus::Failed);
    }

    let control = ControlState::restore(&path);
    assert!(control.disable());
    assert_eq!(control.full_sync_status(), FullSyncStatus::Failed);
    assert_eq!(control.sync_events_health(), SyncEventsHealth::Ok);
}

#[test]
fn corrupted_snapshot_reads_as_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("control.json");
    fs::write(&path, "Disable=yes").unwrap();

    let control = ControlState::restore(&path);
    assert!(!control.disable());
    assert_eq!(control.full_sync_status(), FullSyncStatus::Idle);
    assert_eq!(control.sync_events_health(), SyncEventsHealth::Ok);

    let snapshot = control.snapshot();
    assert_eq!(
        snapshot,
        ControlSnapshot {
            disable: Some(false),
            full_sync_status: Some(FullSyncStatus::Idle),
            sync_events_health: Some(SyncEventsHealth::Ok),
        }
    );
}
