// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pairsync_core::PathFilter;
use std::fs;

#[tokio::test]
async fn write_to_watched_file_triggers_a_transfer() {
    let data = tempfile::tempdir().unwrap();
    let src = data.path().join("srcA");
    fs::write(&src, b"v0").unwrap();

    let h = harness(vec![file_entry(&src)], Role::Active);
    h.engine.start(&h.token);
    tokio::time::sleep(Duration::from_millis(100)).await;

    fs::write(&src, b"v1").unwrap();
    wait_for_invocations(&h, 1).await;

    let commands = h.runner().commands();
    assert!(commands[0].contains(&src.display().to_string()));
    assert_eq!(
        h.engine.control().sync_events_health(),
        SyncEventsHealth::Ok
    );
}

#[tokio::test]
async fn non_transmitting_role_drops_events() {
    let data = tempfile::tempdir().unwrap();
    let src = data.path().join("srcA");
    fs::write(&src, b"v0").unwrap();

    let mut entry = file_entry(&src);
    entry.direction = SyncDirection::Passive2Active;

    // Local role Active must not transmit a Passive2Active entry.
    let h = harness(vec![entry], Role::Active);
    h.engine.start(&h.token);
    tokio::time::sleep(Duration::from_millis(100)).await;

    fs::write(&src, b"v1").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.runner().invocation_count(), 0);
}

#[tokio::test]
async fn excluded_paths_never_transfer() {
    let data = tempfile::tempdir().unwrap();
    let src_dir = data.path().join("srcDir");
    fs::create_dir(&src_dir).unwrap();

    let mut entry = dir_entry(&src_dir);
    entry.exclude = Some(PathFilter::new(
        &src_dir,
        vec![src_dir.join("fileX")],
        false,
    ));

    let h = harness(vec![entry], Role::Active);
    h.engine.start(&h.token);
    tokio::time::sleep(Duration::from_millis(100)).await;

    fs::write(src_dir.join("file1"), b"a").unwrap();
    fs::write(src_dir.join("fileX"), b"b").unwrap();
    wait_for_invocations(&h, 1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let commands = h.runner().commands();
    assert!(commands.iter().any(|c| c.contains("file1")));
    assert!(!commands.iter().any(|c| c.contains("fileX")));
}

#[tokio::test]
async fn deletion_in_directory_mirrors_parent_with_delete() {
    let data = tempfile::tempdir().unwrap();
    let src_dir = data.path().join("srcDir");
    fs::create_dir(&src_dir).unwrap();
    let victim = src_dir.join("victim");
    fs::write(&victim, b"x").unwrap();

    let h = harness(vec![dir_entry(&src_dir)], Role::Active);
    h.engine.start(&h.token);
    tokio::time::sleep(Duration::from_millis(100)).await;

    fs::remove_file(&victim).unwrap();
    wait_for_invocations(&h, 1).await;

    let commands = h.runner().commands();
    assert!(commands
        .iter()
        .any(|c| c.contains("--delete") && c.contains(&format!("{}/", src_dir.display()))));
}

#[tokio::test]
async fn failed_transfer_raises_critical_health() {
    let data = tempfile::tempdir().unwrap();
    let src = data.path().join("srcA");
    fs::write(&src, b"v0").unwrap();

    let h = harness(vec![file_entry(&src)], Role::Active);
    h.runner().push_result(23, "rsync: error");
    h.engine.start(&h.token);
    tokio::time::sleep(Duration::from_millis(100)).await;

    fs::write(&src, b"v1").unwrap();
    wait_for_invocations(&h, 1).await;

    let deadline = tokio::time::timeout(Duration::from_secs(5), async {
        while h.engine.control().sync_events_health() != SyncEventsHealth::Critical {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    });
    deadline.await.expect("health never became critical");
    assert_eq!(h.engine.entries()[0].phase(), EntryPhase::Failing);
}

#[test]
fn coalescing_drops_duplicate_operations() {
    let entry = file_entry(Path::new("/srv/f"));
    let events = vec![
        PathEvent::Write {
            path: PathBuf::from("/srv/f"),
        },
        PathEvent::Write {
            path: PathBuf::from("/srv/f"),
        },
        PathEvent::Delete {
            path: PathBuf::from("/srv/f"),
        },
        PathEvent::Write {
            path: PathBuf::from("/srv/f"),
        },
    ];
    let ops = coalesce_operations(&events, &entry);
    // One copy and one delete survive; repeats collapse.
    assert_eq!(ops.len(), 2);
}

#[test]
fn include_list_gates_operations() {
    let mut entry = dir_entry(Path::new("/srv/dir"));
    entry.include = Some(PathFilter::new(
        Path::new("/srv/dir"),
        vec![PathBuf::from("/srv/dir/keep")],
        true,
    ));

    let events = vec![
        PathEvent::Write {
            path: PathBuf::from("/srv/dir/keep/a"),
        },
        PathEvent::Write {
            path: PathBuf::from("/srv/dir/other/b"),
        },
    ];
    let ops = coalesce_operations(&events, &entry);
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].path(), Path::new("/srv/dir/keep/a"));
}
