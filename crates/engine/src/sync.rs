// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transfer command construction.
//!
//! All command lines the engine hands to the transfer runner are framed
//! here, in one place, so the wire shape is testable as plain strings.
//!
//! - copying a file:      `rsync -a <src> <dst-parent>/`
//! - copying a directory: `rsync -a --delete [filters] <src>/ <dst>/`
//! - deleting a path:     `rsync -a --delete [filters] <parent>/ <dst-parent>/`
//!
//! With a peer address, destinations render as `<peer>:<path>`; without
//! one the transfer degrades to a local copy (single-node bring-up).

use pairsync_core::{mirror_dest, Operation, SyncEntry};
use std::path::{Path, PathBuf};

/// The transfer tool's "some source files vanished" exit code.
pub(crate) const VANISHED_EXIT_CODE: i32 = 24;

/// What one invocation of the transfer tool should move.
pub(crate) struct TransferPlan<'a> {
    pub entry: &'a SyncEntry,
    /// The event-derived operation, or `None` for a whole-entry sync.
    pub op: Option<&'a Operation>,
    /// Substituted source after a vanished-source fallback.
    pub src_override: Option<&'a Path>,
    pub peer: Option<&'a str>,
}

impl TransferPlan<'_> {
    /// The local path this invocation reads from (or, for deletes, the
    /// parent directory it mirrors).
    pub fn source(&self) -> PathBuf {
        if let Some(src) = self.src_override {
            return src.to_path_buf();
        }
        match self.op {
            None => self.entry.path.clone(),
            Some(Operation::Copy { src }) => src.clone(),
            Some(Operation::Delete { dst }) => parent_of(dst),
        }
    }

    pub fn command(&self) -> String {
        let src = self.source();

        let src_is_dir = if src == self.entry.path {
            self.entry.is_dir
        } else {
            src.is_dir()
        };
        let delete_op = matches!(self.op, Some(Operation::Delete { .. }));

        // Directory syncs mirror the tree (removals included); file
        // copies only replace the one file.
        let dir_style = src_is_dir || delete_op;

        let dest_root = self.entry.dest_path.as_deref();
        let mut cmd = String::from("rsync -a");
        if dir_style {
            cmd.push_str(" --delete");
        }

        if let Some(Operation::Delete { dst }) = self.op {
            // Scope the parent mirror to the deleted name so sibling
            // content is neither copied nor removed.
            if let Some(name) = dst.file_name() {
                cmd.push_str(&format!(
                    " --filter='+/ /{}' --filter='-/ /*'",
                    name.to_string_lossy()
                ));
            }
        } else if src == self.entry.path {
            // Filters are anchored at the entry root; they only apply
            // when that root is the transfer root.
            let filters = self.entry.filter_fragment();
            if !filters.is_empty() {
                cmd.push(' ');
                cmd.push_str(&filters);
            }
        }

        if dir_style {
            let dst = mirror_dest(&src, dest_root);
            cmd.push_str(&format!(
                " {}/ {}/",
                src.display(),
                render_dest(self.peer, &dst)
            ));
        } else {
            let dst_parent = parent_of(&mirror_dest(&src, dest_root));
            cmd.push_str(&format!(
                " {} {}/",
                src.display(),
                render_dest(self.peer, &dst_parent)
            ));
        }
        cmd
    }
}

fn render_dest(peer: Option<&str>, path: &Path) -> String {
    match peer {
        Some(addr) => format!("{addr}:{}", path.display()),
        None => path.display().to_string(),
    }
}

fn parent_of(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"))
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
