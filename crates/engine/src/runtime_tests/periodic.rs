// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;

fn periodic_entry(path: &Path, period: Duration) -> SyncEntry {
    SyncEntry {
        sync_type: SyncType::Periodic,
        periodicity: Some(period),
        ..dir_entry(path)
    }
}

#[tokio::test]
async fn periodic_entry_waits_a_full_interval_before_transferring() {
    let data = tempfile::tempdir().unwrap();
    let src = data.path().join("srcDir");
    fs::create_dir(&src).unwrap();

    let h = harness(
        vec![periodic_entry(&src, Duration::from_secs(1))],
        Role::Active,
    );
    h.engine.start(&h.token);

    // Nothing fires before the interval elapses.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.runner().invocation_count(), 0);

    wait_for_invocations(&h, 1).await;
    let commands = h.runner().commands();
    assert!(commands[0].contains(&format!("{}/", src.display())));
}

#[tokio::test]
async fn disabled_periodic_entry_wakes_but_does_not_transfer() {
    let data = tempfile::tempdir().unwrap();
    let src = data.path().join("srcDir");
    fs::create_dir(&src).unwrap();

    let h = harness(
        vec![periodic_entry(&src, Duration::from_secs(1))],
        Role::Active,
    );
    h.engine.control().set_disable(true);
    h.engine.start(&h.token);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(h.runner().invocation_count(), 0);
}

#[tokio::test]
async fn periodic_entry_respects_role_eligibility() {
    let data = tempfile::tempdir().unwrap();
    let src = data.path().join("srcDir");
    fs::create_dir(&src).unwrap();

    let mut entry = periodic_entry(&src, Duration::from_secs(1));
    entry.direction = SyncDirection::Passive2Active;

    let h = harness(vec![entry], Role::Active);
    h.engine.start(&h.token);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(h.runner().invocation_count(), 0);
}

#[tokio::test]
async fn periodic_entry_keeps_transferring_each_interval() {
    let data = tempfile::tempdir().unwrap();
    let src = data.path().join("srcDir");
    fs::create_dir(&src).unwrap();

    let h = harness(
        vec![periodic_entry(&src, Duration::from_secs(1))],
        Role::Active,
    );
    h.engine.start(&h.token);

    wait_for_invocations(&h, 2).await;
    assert!(h.runner().invocation_count() >= 2);
}
