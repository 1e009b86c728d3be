// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kernel notification demultiplexer.
//!
//! One `PathWatcher` covers one catalogue entry. It owns an inotify
//! instance, keeps the watch-descriptor → base-path map needed to
//! reconstitute absolute paths from event names, and translates the raw
//! mask stream into typed [`PathEvent`]s.
//!
//! A target that does not exist yet is tracked through its nearest
//! existing ancestor with a widened mask; once the target appears the
//! watcher escalates onto it. Directory targets are watched recursively:
//! a subdirectory watch is added synchronously with the `Create` event
//! that reports the subdirectory, before any later event is drained.

use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask};
use pairsync_core::{nearest_existing_parent, PathEvent};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to initialize the notification interface: {0}")]
    Init(std::io::Error),

    #[error("failed to add watch on {path}: {source}")]
    AddWatch {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read notification events: {0}")]
    Read(std::io::Error),
}

/// Events a watched file can produce.
fn file_mask() -> WatchMask {
    WatchMask::CLOSE_WRITE | WatchMask::DELETE_SELF | WatchMask::MOVE_SELF
}

/// Events a watched directory (target or subdirectory) can produce.
fn dir_mask() -> WatchMask {
    WatchMask::CLOSE_WRITE
        | WatchMask::CREATE
        | WatchMask::DELETE
        | WatchMask::MOVED_FROM
        | WatchMask::MOVED_TO
        | WatchMask::DELETE_SELF
        | WatchMask::MOVE_SELF
}

/// Widened mask used on an ancestor while the real target is missing.
fn ancestor_mask() -> WatchMask {
    WatchMask::CREATE
        | WatchMask::CLOSE_WRITE
        | WatchMask::MOVED_TO
        | WatchMask::DELETE
        | WatchMask::DELETE_SELF
}

/// Where the watcher is currently anchored.
enum Anchor {
    /// The target itself (and, for directories, its subtree) is watched.
    Target,
    /// The target is missing; this ancestor is watched in its place.
    Ancestor { wd: WatchDescriptor, path: PathBuf },
}

/// One event as pulled out of the kernel buffer.
struct RawEvent {
    wd: WatchDescriptor,
    mask: EventMask,
    cookie: u32,
    name: Option<OsString>,
}

/// Watches one catalogue path and yields typed events.
pub struct PathWatcher {
    fd: AsyncFd<Inotify>,
    target: PathBuf,
    target_is_dir: bool,
    /// Descriptor → base path. Entries linger until the kernel's IGNORED
    /// arrives so late events in the same batch still resolve.
    watches: HashMap<WatchDescriptor, PathBuf>,
    anchor: Anchor,
    buffer: [u8; 4096],
}

impl PathWatcher {
    /// Start watching `target`. If it does not exist yet, its nearest
    /// existing ancestor is watched until it appears.
    pub fn new(target: &Path, target_is_dir: bool) -> Result<Self, WatchError> {
        let inotify = Inotify::init().map_err(WatchError::Init)?;
        let fd = AsyncFd::with_interest(inotify, Interest::READABLE).map_err(WatchError::Init)?;

        let mut watcher = Self {
            fd,
            target: target.to_path_buf(),
            target_is_dir,
            watches: HashMap::new(),
            anchor: Anchor::Target,
            buffer: [0u8; 4096],
        };

        if target.exists() {
            watcher.watch_target()?;
        } else {
            debug!(path = %target.display(), "watch target missing, tracking ancestor");
            watcher.anchor_to_ancestor()?;
        }
        Ok(watcher)
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Suspend until at least one meaningful event is available.
    ///
    /// A single kernel read may return many packed events; the whole
    /// buffer is drained and translated before returning.
    pub async fn next_events(&mut self) -> Result<Vec<PathEvent>, WatchError> {
        loop {
            let batch = self.read_batch().await?;
            let mut out = Vec::new();
            for raw in batch {
                self.translate(raw, &mut out)?;
            }
            if !out.is_empty() {
                return Ok(out);
            }
        }
    }

    async fn read_batch(&mut self) -> Result<Vec<RawEvent>, WatchError> {
        loop {
            let mut guard = self.fd.readable_mut().await.map_err(WatchError::Read)?;
            let buffer = &mut self.buffer;
            let result = guard.try_io(|inner| {
                let events = inner.get_mut().read_events(buffer)?;
                Ok(events
                    .map(|e| RawEvent {
                        wd: e.wd.clone(),
                        mask: e.mask,
                        cookie: e.cookie,
                        name: e.name.map(|n| n.to_os_string()),
                    })
                    .collect::<Vec<_>>())
            });
            match result {
                Ok(Ok(batch)) if !batch.is_empty() => return Ok(batch),
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Err(WatchError::Read(e)),
                Err(_would_block) => continue,
            }
        }
    }

    fn translate(&mut self, raw: RawEvent, out: &mut Vec<PathEvent>) -> Result<(), WatchError> {
        if raw.mask.contains(EventMask::Q_OVERFLOW) {
            // The kernel dropped events; force a full copy of the entry
            // rather than losing changes.
            warn!(target = %self.target.display(), "notification queue overflowed");
            out.push(PathEvent::Write {
                path: self.target.clone(),
            });
            return Ok(());
        }

        if raw.mask.contains(EventMask::IGNORED) {
            self.watches.remove(&raw.wd);
            return Ok(());
        }

        let Some(base) = self.watches.get(&raw.wd).cloned() else {
            debug!(mask = ?raw.mask, "event for unknown watch descriptor dropped");
            return Ok(());
        };

        let path = match &raw.name {
            Some(name) if !name.is_empty() => base.join(name),
            _ => base.clone(),
        };

        if matches!(self.anchor, Anchor::Ancestor { .. }) {
            self.translate_anchored(raw, path, out)
        } else {
            self.translate_on_target(raw, base, path, out)
        }
    }

    /// Events while only an ancestor of the missing target is watched.
    fn translate_anchored(
        &mut self,
        raw: RawEvent,
        path: PathBuf,
        out: &mut Vec<PathEvent>,
    ) -> Result<(), WatchError> {
        if raw.mask.contains(EventMask::DELETE_SELF) {
            // The ancestor itself went away; fall further up.
            self.forget_all_watches();
            self.anchor_to_ancestor()?;
            return Ok(());
        }

        let appeared = raw.mask.contains(EventMask::CREATE)
            || raw.mask.contains(EventMask::MOVED_TO)
            || raw.mask.contains(EventMask::CLOSE_WRITE);
        if !appeared {
            return Ok(());
        }

        if path == self.target {
            self.escalate_to_target()?;
            if raw.mask.contains(EventMask::CLOSE_WRITE) {
                out.push(PathEvent::Write { path });
            } else {
                out.push(PathEvent::Create {
                    path,
                    is_dir: raw.mask.contains(EventMask::ISDIR),
                });
            }
        } else if self.target.starts_with(&path) && raw.mask.contains(EventMask::ISDIR) {
            // An intermediate directory appeared; the whole chain may
            // even be complete already (mkdir -p).
            if self.target.exists() {
                self.escalate_to_target()?;
                out.push(PathEvent::Create {
                    path: self.target.clone(),
                    is_dir: self.target_is_dir,
                });
            } else {
                self.drop_anchor_watch();
                self.anchor_to_ancestor()?;
            }
        }
        Ok(())
    }

    /// Events while the target itself is watched.
    fn translate_on_target(
        &mut self,
        raw: RawEvent,
        base: PathBuf,
        path: PathBuf,
        out: &mut Vec<PathEvent>,
    ) -> Result<(), WatchError> {
        // Late events on a dropped ancestor watch can name siblings
        // outside the entry; only the target's own subtree matters here.
        if !path.starts_with(&self.target) {
            return Ok(());
        }

        let mask = raw.mask;

        if mask.contains(EventMask::DELETE_SELF) || mask.contains(EventMask::MOVE_SELF) {
            if base == self.target {
                // MOVE_SELF leaves kernel watches alive on the relocated
                // tree; drop everything before re-anchoring.
                self.forget_all_watches();
                self.anchor_to_ancestor()?;
                out.push(PathEvent::SelfDelete {
                    path: self.target.clone(),
                });
            } else if mask.contains(EventMask::MOVE_SELF) {
                let _ = self.fd.get_ref().watches().remove(raw.wd.clone());
                self.watches.remove(&raw.wd);
            }
            // A deleted subdirectory is reported by its parent's DELETE.
            return Ok(());
        }

        if mask.contains(EventMask::CREATE) || mask.contains(EventMask::MOVED_TO) {
            let is_dir = mask.contains(EventMask::ISDIR);
            if is_dir {
                // Watch the new subtree before draining anything else.
                self.add_watch(&path, dir_mask())?;
                self.add_subdir_watches(&path);
            }
            if mask.contains(EventMask::MOVED_TO) {
                out.push(PathEvent::MovedIn {
                    path,
                    cookie: raw.cookie,
                });
            } else {
                out.push(PathEvent::Create { path, is_dir });
            }
            return Ok(());
        }

        if mask.contains(EventMask::MOVED_FROM) {
            out.push(PathEvent::MovedOut {
                path,
                cookie: raw.cookie,
            });
            return Ok(());
        }

        if mask.contains(EventMask::DELETE) {
            out.push(PathEvent::Delete { path });
            return Ok(());
        }

        if mask.contains(EventMask::CLOSE_WRITE) && !mask.contains(EventMask::ISDIR) {
            out.push(PathEvent::Write { path });
        }
        Ok(())
    }

    /// Put real watches on the (now existing) target.
    fn watch_target(&mut self) -> Result<(), WatchError> {
        let mask = if self.target_is_dir { dir_mask() } else { file_mask() };
        let target = self.target.clone();
        self.add_watch(&target, mask)?;
        if self.target_is_dir {
            self.add_subdir_watches(&target);
        }
        self.anchor = Anchor::Target;
        Ok(())
    }

    /// Swap the ancestor watch for real target watches.
    fn escalate_to_target(&mut self) -> Result<(), WatchError> {
        debug!(path = %self.target.display(), "watch target appeared, escalating");
        self.drop_anchor_watch();
        self.watch_target()
    }

    /// Watch the nearest existing ancestor of the missing target.
    fn anchor_to_ancestor(&mut self) -> Result<(), WatchError> {
        let ancestor = nearest_existing_parent(&self.target);
        let wd = self.add_watch(&ancestor, ancestor_mask())?;
        self.anchor = Anchor::Ancestor {
            wd,
            path: ancestor,
        };
        Ok(())
    }

    fn add_watch(&mut self, path: &Path, mask: WatchMask) -> Result<WatchDescriptor, WatchError> {
        let wd = self
            .fd
            .get_ref()
            .watches()
            .add(path, mask)
            .map_err(|source| WatchError::AddWatch {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "watch added");
        self.watches.insert(wd.clone(), path.to_path_buf());
        Ok(wd)
    }

    /// Recursively watch every subdirectory under `dir`.
    fn add_subdir_watches(&mut self, dir: &Path) {
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            let Ok(listing) = std::fs::read_dir(&current) else {
                continue;
            };
            for entry in listing.filter_map(|e| e.ok()) {
                let path = entry.path();
                if path.is_dir() {
                    match self.add_watch(&path, dir_mask()) {
                        Ok(_) => pending.push(path),
                        Err(e) => warn!(error = %e, "failed to watch subdirectory"),
                    }
                }
            }
        }
    }

    /// Remove the ancestor watch kernel-side; the map entry stays until
    /// IGNORED so buffered events still resolve.
    fn drop_anchor_watch(&mut self) {
        if let Anchor::Ancestor { wd, path } = &self.anchor {
            debug!(path = %path.display(), "dropping ancestor watch");
            let _ = self.fd.get_ref().watches().remove(wd.clone());
        }
    }

    /// Tear down every kernel watch this instance owns.
    fn forget_all_watches(&mut self) {
        for wd in self.watches.keys() {
            let _ = self.fd.get_ref().watches().remove(wd.clone());
        }
        self.watches.clear();
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
