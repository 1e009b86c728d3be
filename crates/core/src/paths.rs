// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path arithmetic shared by the watcher, retry fallback, and transfer
//! command construction.

use std::path::{Path, PathBuf};

/// Walk up from `path` to the closest ancestor that exists on disk.
///
/// Falls back to `/` when nothing along the way exists (the root always
/// does on a live system).
pub fn nearest_existing_parent(path: &Path) -> PathBuf {
    let mut current = path;
    while let Some(parent) = current.parent() {
        if parent.exists() {
            return parent.to_path_buf();
        }
        current = parent;
    }
    PathBuf::from("/")
}

/// Compute where `src` lands on the peer.
///
/// With a destination root configured, the source's absolute path is
/// re-rooted under it (`/srv/data/f` + root `/backup` → `/backup/srv/data/f`).
/// Without one the path mirrors verbatim.
pub fn mirror_dest(src: &Path, dest_root: Option<&Path>) -> PathBuf {
    match dest_root {
        Some(root) => match src.strip_prefix("/") {
            Ok(rel) => root.join(rel),
            Err(_) => root.join(src),
        },
        None => src.to_path_buf(),
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
