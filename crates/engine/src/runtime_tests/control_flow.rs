// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pairsync_core::{NotifyMethod, NotifyMode, NotifySibling};
use serde_json::json;
use std::fs;

#[tokio::test]
async fn disable_pauses_health_and_enable_restores_it() {
    let h = harness(vec![], Role::Active);

    h.engine.control().set_disable(true);
    h.engine.disable_changed(true);
    assert_eq!(
        h.engine.control().sync_events_health(),
        SyncEventsHealth::Paused
    );

    h.engine.control().set_disable(false);
    h.engine.disable_changed(false);
    assert_eq!(
        h.engine.control().sync_events_health(),
        SyncEventsHealth::Ok
    );
}

#[tokio::test]
async fn critical_health_is_sticky_across_disable_flips() {
    let h = harness(vec![], Role::Active);
    h.engine
        .control()
        .set_sync_events_health(SyncEventsHealth::Critical);

    h.engine.disable_changed(true);
    assert_eq!(
        h.engine.control().sync_events_health(),
        SyncEventsHealth::Critical
    );
    h.engine.disable_changed(false);
    assert_eq!(
        h.engine.control().sync_events_health(),
        SyncEventsHealth::Critical
    );
}

#[tokio::test]
async fn successful_sync_queues_peer_notification() {
    let data = tempfile::tempdir().unwrap();
    let src = data.path().join("app.conf");
    fs::write(&src, b"cfg").unwrap();

    let mut entry = file_entry(&src);
    entry.notify_sibling = Some(NotifySibling {
        paths: None,
        mode: NotifyMode::Systemd,
        method: NotifyMethod::Reload,
        services: vec!["app.service".into()],
        request: json!({
            "Mode": "Systemd",
            "Method": "Reload",
            "NotifyServices": ["app.service"]
        }),
    });

    let h = harness(vec![entry], Role::Active);
    let state = Arc::clone(&h.engine.entries()[0]);
    let ok = h.engine.sync_whole_entry(&state, &h.token).await;
    assert!(ok);

    let spools: Vec<_> = fs::read_dir(h.outbox())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    assert_eq!(spools.len(), 1);
    let body: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&spools[0]).unwrap()).unwrap();
    assert_eq!(body["ModifiedDataPath"], src.display().to_string());
}

#[tokio::test]
async fn failed_sync_does_not_notify_and_writes_a_report() {
    let data = tempfile::tempdir().unwrap();
    let src = data.path().join("app.conf");
    fs::write(&src, b"cfg").unwrap();

    let h = harness(vec![file_entry(&src)], Role::Active);
    h.runner().push_result(12, "rsync: protocol error");

    let state = Arc::clone(&h.engine.entries()[0]);
    let ok = h.engine.sync_whole_entry(&state, &h.token).await;
    assert!(!ok);
    assert_eq!(state.phase(), EntryPhase::Failing);

    assert!(!h.outbox().exists());
    let reports: Vec<_> = fs::read_dir(h.dir.path().join("reports"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    // The record plus its capture file.
    assert_eq!(reports.len(), 2);
}

#[tokio::test]
async fn entry_phase_returns_to_armed_after_success() {
    let data = tempfile::tempdir().unwrap();
    let src = data.path().join("f");
    fs::write(&src, b"x").unwrap();

    let h = harness(vec![file_entry(&src)], Role::Active);
    let state = Arc::clone(&h.engine.entries()[0]);
    assert_eq!(state.phase(), EntryPhase::Idle);

    assert!(h.engine.sync_whole_entry(&state, &h.token).await);
    assert_eq!(state.phase(), EntryPhase::Armed);
    assert!(state.in_progress_paths().is_empty());
}
