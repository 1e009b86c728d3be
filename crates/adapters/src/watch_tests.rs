// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pairsync_core::PathEvent;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

/// Keep calling `next_events` until `pred` matches one, accumulating
/// everything seen. Panics after five seconds without a match.
async fn collect_until(
    watcher: &mut PathWatcher,
    pred: impl Fn(&PathEvent) -> bool,
) -> Vec<PathEvent> {
    let mut seen = Vec::new();
    let deadline = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let batch = watcher.next_events().await.unwrap();
            let found = batch.iter().any(&pred);
            seen.extend(batch);
            if found {
                return;
            }
        }
    });
    deadline.await.expect("timed out waiting for event");
    seen
}

#[tokio::test]
async fn close_write_on_file_target_yields_write() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("data.txt");
    fs::write(&file, b"v0").unwrap();

    let mut watcher = PathWatcher::new(&file, false).unwrap();
    fs::write(&file, b"v1").unwrap();

    let events = collect_until(&mut watcher, |e| matches!(e, PathEvent::Write { .. })).await;
    assert!(events.contains(&PathEvent::Write { path: file.clone() }));
}

#[tokio::test]
async fn create_inside_watched_directory() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();

    let mut watcher = PathWatcher::new(&root, true).unwrap();
    let file = root.join("new.txt");
    fs::write(&file, b"hello").unwrap();

    let events =
        collect_until(&mut watcher, |e| matches!(e, PathEvent::Write { .. })).await;
    assert!(events.contains(&PathEvent::Create {
        path: file.clone(),
        is_dir: false
    }));
    assert!(events.contains(&PathEvent::Write { path: file.clone() }));
}

#[tokio::test]
async fn delete_inside_watched_directory() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    let file = root.join("victim.txt");
    fs::write(&file, b"x").unwrap();

    let mut watcher = PathWatcher::new(&root, true).unwrap();
    fs::remove_file(&file).unwrap();

    let events = collect_until(&mut watcher, |e| matches!(e, PathEvent::Delete { .. })).await;
    assert!(events.contains(&PathEvent::Delete { path: file.clone() }));
}

#[tokio::test]
async fn rename_within_directory_pairs_by_cookie() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    let old = root.join("old.txt");
    fs::write(&old, b"x").unwrap();

    let mut watcher = PathWatcher::new(&root, true).unwrap();
    let new = root.join("new.txt");
    fs::rename(&old, &new).unwrap();

    let events = collect_until(&mut watcher, |e| matches!(e, PathEvent::MovedIn { .. })).await;
    let out_cookie = events.iter().find_map(|e| match e {
        PathEvent::MovedOut { path, cookie } if *path == old => Some(*cookie),
        _ => None,
    });
    let in_cookie = events.iter().find_map(|e| match e {
        PathEvent::MovedIn { path, cookie } if *path == new => Some(*cookie),
        _ => None,
    });
    assert_eq!(out_cookie.expect("MovedOut"), in_cookie.expect("MovedIn"));
}

#[tokio::test]
async fn move_out_of_tree_is_a_moved_out() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    let outside = dir.path().join("outside");
    fs::create_dir(&root).unwrap();
    fs::create_dir(&outside).unwrap();
    let file = root.join("leaving.txt");
    fs::write(&file, b"x").unwrap();

    let mut watcher = PathWatcher::new(&root, true).unwrap();
    fs::rename(&file, outside.join("gone.txt")).unwrap();

    let events = collect_until(&mut watcher, |e| matches!(e, PathEvent::MovedOut { .. })).await;
    assert!(events
        .iter()
        .any(|e| matches!(e, PathEvent::MovedOut { path, .. } if *path == file)));
}

#[tokio::test]
async fn missing_target_escalates_when_it_appears() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("not-yet.txt");

    let mut watcher = PathWatcher::new(&target, false).unwrap();
    fs::write(&target, b"now").unwrap();

    let events = collect_until(&mut watcher, |e| matches!(e, PathEvent::Write { .. })).await;
    assert!(events.contains(&PathEvent::Write {
        path: target.clone()
    }));

    // The watch now sits on the target itself: a plain rewrite surfaces.
    fs::write(&target, b"again").unwrap();
    let events = collect_until(&mut watcher, |e| matches!(e, PathEvent::Write { .. })).await;
    assert!(events.contains(&PathEvent::Write {
        path: target.clone()
    }));
}

#[tokio::test]
async fn missing_target_behind_missing_directories() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("a/b/file.txt");

    let mut watcher = PathWatcher::new(&target, false).unwrap();

    fs::create_dir_all(dir.path().join("a/b")).unwrap();
    fs::write(&target, b"deep").unwrap();

    let events = collect_until(&mut watcher, |e| {
        matches!(e, PathEvent::Write { .. } | PathEvent::Create { .. })
    })
    .await;
    assert!(events.iter().any(|e| e.path() == target));
}

#[tokio::test]
async fn new_subdirectory_is_watched_recursively() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();

    let mut watcher = PathWatcher::new(&root, true).unwrap();
    let sub = root.join("sub");
    fs::create_dir(&sub).unwrap();

    let events = collect_until(&mut watcher, |e| matches!(e, PathEvent::Create { .. })).await;
    assert!(events.contains(&PathEvent::Create {
        path: sub.clone(),
        is_dir: true
    }));

    // Events inside the new subdirectory prove the recursive watch.
    let nested = sub.join("nested.txt");
    fs::write(&nested, b"x").unwrap();
    let events = collect_until(&mut watcher, |e| matches!(e, PathEvent::Write { .. })).await;
    assert!(events.contains(&PathEvent::Write {
        path: nested.clone()
    }));
}

#[tokio::test]
async fn pre_existing_subdirectories_are_watched() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    let sub = root.join("sub");
    fs::create_dir_all(&sub).unwrap();

    let mut watcher = PathWatcher::new(&root, true).unwrap();
    let nested = sub.join("nested.txt");
    fs::write(&nested, b"x").unwrap();

    let events = collect_until(&mut watcher, |e| matches!(e, PathEvent::Write { .. })).await;
    assert!(events.contains(&PathEvent::Write {
        path: nested.clone()
    }));
}

#[tokio::test]
async fn deleting_file_target_reports_self_delete_and_recovers() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("volatile.txt");
    fs::write(&file, b"x").unwrap();

    let mut watcher = PathWatcher::new(&file, false).unwrap();
    fs::remove_file(&file).unwrap();

    let events =
        collect_until(&mut watcher, |e| matches!(e, PathEvent::SelfDelete { .. })).await;
    assert!(events.contains(&PathEvent::SelfDelete { path: file.clone() }));

    // The watcher fell back to the parent; recreation is seen again.
    fs::write(&file, b"reborn").unwrap();
    let events = collect_until(&mut watcher, |e| {
        matches!(e, PathEvent::Write { .. } | PathEvent::Create { .. })
    })
    .await;
    assert!(events.iter().any(|e| e.path() == file));
}

#[tokio::test]
async fn single_read_drains_multiple_packed_events() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();

    let mut watcher = PathWatcher::new(&root, true).unwrap();
    for i in 0..5 {
        fs::write(root.join(format!("f{i}.txt")), b"x").unwrap();
    }

    let mut writes = std::collections::HashSet::new();
    let deadline = tokio::time::timeout(Duration::from_secs(5), async {
        while writes.len() < 5 {
            for event in watcher.next_events().await.unwrap() {
                if let PathEvent::Write { path } = event {
                    writes.insert(path);
                }
            }
        }
    });
    deadline.await.expect("timed out draining events");
    assert_eq!(writes.len(), 5);
}
