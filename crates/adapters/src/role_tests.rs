// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pairsync_core::Role;
use std::fs;
use tempfile::tempdir;

#[test]
fn loads_published_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("redundancy.json");
    fs::write(
        &path,
        r#"{"Role": "Passive", "RedundancyEnabled": true, "PeerAddress": "10.0.0.1"}"#,
    )
    .unwrap();

    let provider = FileRoleProvider::load(&path).unwrap();
    assert_eq!(provider.role(), Role::Passive);
    assert!(provider.redundancy_enabled());
    assert_eq!(provider.peer_address().as_deref(), Some("10.0.0.1"));
    assert!(provider.peer_reachable());
}

#[test]
fn missing_state_file_is_fatal() {
    let dir = tempdir().unwrap();
    let err = FileRoleProvider::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, RoleError::Io { .. }));
}

#[test]
fn corrupt_state_file_is_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("redundancy.json");
    fs::write(&path, "{oops").unwrap();
    let err = FileRoleProvider::load(&path).unwrap_err();
    assert!(matches!(err, RoleError::Parse { .. }));
}

#[test]
fn refresh_picks_up_changes_and_survives_corruption() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("redundancy.json");
    fs::write(&path, r#"{"Role": "Active", "RedundancyEnabled": true}"#).unwrap();

    let provider = FileRoleProvider::load(&path).unwrap();
    assert_eq!(provider.role(), Role::Active);

    fs::write(&path, r#"{"Role": "Passive", "RedundancyEnabled": true}"#).unwrap();
    provider.refresh();
    assert_eq!(provider.role(), Role::Passive);

    // A bad rewrite keeps the last good state.
    fs::write(&path, "garbage").unwrap();
    provider.refresh();
    assert_eq!(provider.role(), Role::Passive);
}

#[tokio::test]
async fn watch_changes_refreshes_on_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("redundancy.json");
    fs::write(&path, r#"{"Role": "Active", "RedundancyEnabled": true}"#).unwrap();

    let provider = std::sync::Arc::new(FileRoleProvider::load(&path).unwrap());
    let token = tokio_util::sync::CancellationToken::new();
    let task = tokio::spawn(provider.clone().watch_changes(token.clone()));
    tokio::task::yield_now().await;

    fs::write(&path, r#"{"Role": "Passive", "RedundancyEnabled": false}"#).unwrap();

    let deadline = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while provider.role() != Role::Passive {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
    });
    deadline.await.expect("role change not observed");
    assert!(!provider.redundancy_enabled());

    token.cancel();
    task.await.unwrap();
}

#[test]
fn fake_provider_setters() {
    let fake = FakeRoleProvider::new(Role::Active);
    assert_eq!(fake.role(), Role::Active);
    fake.set_role(Role::Unknown);
    fake.set_redundancy_enabled(false);
    fake.set_peer_address(Some("peer"));
    fake.set_peer_reachable(false);
    assert_eq!(fake.role(), Role::Unknown);
    assert!(!fake.redundancy_enabled());
    assert_eq!(fake.peer_address().as_deref(), Some("peer"));
    assert!(!fake.peer_reachable());
}
