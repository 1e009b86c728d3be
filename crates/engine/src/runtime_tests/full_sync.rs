// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;

fn four_file_entries(dir: &Path) -> Vec<SyncEntry> {
    (0..4)
        .map(|i| {
            let src = dir.join(format!("src{i}"));
            fs::write(&src, format!("content {i}")).unwrap();
            file_entry(&src)
        })
        .collect()
}

#[tokio::test]
async fn full_sync_over_all_eligible_entries_completes() {
    let data = tempfile::tempdir().unwrap();
    let h = harness(four_file_entries(data.path()), Role::Active);

    h.engine.try_begin_full_sync().unwrap();
    Arc::clone(&h.engine).run_full_sync(h.token.clone()).await;

    assert_eq!(
        h.engine.control().full_sync_status(),
        FullSyncStatus::Completed
    );
    assert_eq!(h.runner().invocation_count(), 4);
}

#[tokio::test]
async fn one_failing_entry_fails_the_full_sync_but_not_the_rest() {
    let data = tempfile::tempdir().unwrap();
    let h = harness(four_file_entries(data.path()), Role::Active);

    // First entry fails its single attempt; the rest succeed.
    h.runner().push_result(23, "rsync: no such file");
    Arc::clone(&h.engine).run_full_sync(h.token.clone()).await;

    assert_eq!(
        h.engine.control().full_sync_status(),
        FullSyncStatus::Failed
    );
    // Every entry was still attempted.
    assert_eq!(h.runner().invocation_count(), 4);
}

#[tokio::test]
async fn full_sync_skips_entries_the_role_does_not_transmit() {
    let data = tempfile::tempdir().unwrap();
    let mut entries = four_file_entries(data.path());
    entries[0].direction = SyncDirection::Passive2Active;
    entries[1].direction = SyncDirection::Bidirectional;

    let h = harness(entries, Role::Active);
    Arc::clone(&h.engine).run_full_sync(h.token.clone()).await;

    assert_eq!(
        h.engine.control().full_sync_status(),
        FullSyncStatus::Completed
    );
    // The Passive2Active entry is skipped; Bidirectional transmits.
    assert_eq!(h.runner().invocation_count(), 3);
}

#[tokio::test]
async fn start_is_rejected_while_disabled() {
    let data = tempfile::tempdir().unwrap();
    let h = harness(four_file_entries(data.path()), Role::Active);
    h.engine.control().set_disable(true);

    assert_eq!(
        h.engine.try_begin_full_sync(),
        Err(FullSyncRejection::SyncDisabled)
    );
}

#[tokio::test]
async fn start_is_rejected_when_peer_is_unreachable() {
    let data = tempfile::tempdir().unwrap();
    let h = harness(four_file_entries(data.path()), Role::Active);
    h.roles.set_peer_reachable(false);

    assert_eq!(
        h.engine.try_begin_full_sync(),
        Err(FullSyncRejection::SiblingBmcNotAvailable)
    );
}

#[tokio::test]
async fn start_is_rejected_while_already_in_progress() {
    let data = tempfile::tempdir().unwrap();
    let h = harness(four_file_entries(data.path()), Role::Active);
    h.engine
        .control()
        .set_full_sync_status(FullSyncStatus::InProgress);

    assert_eq!(
        h.engine.try_begin_full_sync(),
        Err(FullSyncRejection::FullSyncInProgress)
    );
}

#[tokio::test]
async fn the_gate_claims_in_progress_before_the_sync_task_runs() {
    let data = tempfile::tempdir().unwrap();
    let h = harness(four_file_entries(data.path()), Role::Active);

    // First caller claims the status synchronously; a second request
    // arriving before the spawned sync is polled is already rejected.
    h.engine.try_begin_full_sync().unwrap();
    assert_eq!(
        h.engine.control().full_sync_status(),
        FullSyncStatus::InProgress
    );
    assert_eq!(
        h.engine.try_begin_full_sync(),
        Err(FullSyncRejection::FullSyncInProgress)
    );

    Arc::clone(&h.engine).run_full_sync(h.token.clone()).await;
    assert_eq!(
        h.engine.control().full_sync_status(),
        FullSyncStatus::Completed
    );
}

#[tokio::test]
async fn rejection_messages_match_the_documented_errors() {
    assert_eq!(FullSyncRejection::SyncDisabled.to_string(), "SyncDisabled");
    assert_eq!(
        FullSyncRejection::SiblingBmcNotAvailable.to_string(),
        "SiblingBMCNotAvailable"
    );
    assert_eq!(
        FullSyncRejection::FullSyncInProgress.to_string(),
        "FullSyncInProgress"
    );
}
