// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn nearest_existing_parent_walks_to_first_real_ancestor() {
    let dir = tempdir().unwrap();
    let existing = dir.path().join("present");
    fs::create_dir(&existing).unwrap();

    let missing = existing.join("gone/deeper/file.txt");
    assert_eq!(nearest_existing_parent(&missing), existing);
}

#[test]
fn nearest_existing_parent_of_existing_path_is_its_parent() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("f");
    fs::write(&file, b"x").unwrap();
    assert_eq!(nearest_existing_parent(&file), dir.path());
}

#[test]
fn mirror_dest_without_root_is_identity() {
    assert_eq!(
        mirror_dest(Path::new("/srv/data/f"), None),
        PathBuf::from("/srv/data/f")
    );
}

#[test]
fn mirror_dest_re_roots_absolute_sources() {
    assert_eq!(
        mirror_dest(Path::new("/srv/data/f"), Some(Path::new("/backup"))),
        PathBuf::from("/backup/srv/data/f")
    );
}
