// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Role provider: who we are in the pair, and how to reach the peer.
//!
//! The redundancy manager (a separate daemon) publishes its view as a
//! JSON state file. `FileRoleProvider` reads that file once at startup
//! and re-reads it whenever it changes; a missing file at startup is
//! fatal to initialization.

use crate::watch::PathWatcher;
use pairsync_core::{PathEvent, RedundancyState, Role};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RoleError {
    #[error("failed to read redundancy state from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse redundancy state in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Read-side view of the redundancy manager's published state.
pub trait RoleProvider: Send + Sync + 'static {
    fn role(&self) -> Role;
    fn redundancy_enabled(&self) -> bool;
    fn peer_address(&self) -> Option<String>;
    fn peer_reachable(&self) -> bool;
}

/// Role provider backed by the redundancy manager's state file.
#[derive(Debug)]
pub struct FileRoleProvider {
    path: PathBuf,
    state: Mutex<RedundancyState>,
}

impl FileRoleProvider {
    /// Load the published state. Errors (missing file included) abort
    /// startup; the daemon is useless without knowing its role.
    pub fn load(path: &Path) -> Result<Self, RoleError> {
        let state = read_state(path)?;
        info!(
            role = %state.role,
            redundancy = state.redundancy_enabled,
            "redundancy state loaded"
        );
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(state),
        })
    }

    /// Re-read the state file, keeping the old state on failure.
    pub fn refresh(&self) {
        match read_state(&self.path) {
            Ok(state) => {
                let mut guard = self.state.lock();
                if *guard != state {
                    info!(role = %state.role, "redundancy state changed");
                    *guard = state;
                }
            }
            Err(e) => warn!(error = %e, "failed to refresh redundancy state"),
        }
    }

    /// Follow the state file until cancelled, refreshing on every change.
    pub async fn watch_changes(self: std::sync::Arc<Self>, token: CancellationToken) {
        let mut watcher = match PathWatcher::new(&self.path, false) {
            Ok(w) => w,
            Err(e) => {
                error!(error = %e, "cannot watch redundancy state file");
                return;
            }
        };
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                events = watcher.next_events() => {
                    match events {
                        Ok(events) => {
                            if events.iter().any(|e| {
                                matches!(e, PathEvent::Write { .. } | PathEvent::Create { .. } | PathEvent::MovedIn { .. })
                            }) {
                                self.refresh();
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "redundancy state watch failed");
                            return;
                        }
                    }
                }
            }
        }
    }
}

fn read_state(path: &Path) -> Result<RedundancyState, RoleError> {
    let text = std::fs::read_to_string(path).map_err(|source| RoleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| RoleError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl RoleProvider for FileRoleProvider {
    fn role(&self) -> Role {
        self.state.lock().role
    }

    fn redundancy_enabled(&self) -> bool {
        self.state.lock().redundancy_enabled
    }

    fn peer_address(&self) -> Option<String> {
        self.state.lock().peer_address.clone()
    }

    fn peer_reachable(&self) -> bool {
        self.state.lock().peer_reachable
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRoleProvider;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;

    /// In-memory role provider for tests.
    pub struct FakeRoleProvider {
        state: Mutex<RedundancyState>,
    }

    impl FakeRoleProvider {
        pub fn new(role: Role) -> Self {
            Self {
                state: Mutex::new(RedundancyState {
                    role,
                    redundancy_enabled: true,
                    peer_address: None,
                    peer_reachable: true,
                }),
            }
        }

        pub fn set_role(&self, role: Role) {
            self.state.lock().role = role;
        }

        pub fn set_redundancy_enabled(&self, enabled: bool) {
            self.state.lock().redundancy_enabled = enabled;
        }

        pub fn set_peer_address(&self, address: Option<&str>) {
            self.state.lock().peer_address = address.map(str::to_string);
        }

        pub fn set_peer_reachable(&self, reachable: bool) {
            self.state.lock().peer_reachable = reachable;
        }
    }

    impl RoleProvider for FakeRoleProvider {
        fn role(&self) -> Role {
            self.state.lock().role
        }

        fn redundancy_enabled(&self) -> bool {
            self.state.lock().redundancy_enabled
        }

        fn peer_address(&self) -> Option<String> {
            self.state.lock().peer_address.clone()
        }

        fn peer_reachable(&self) -> bool {
            self.state.lock().peer_reachable
        }
    }
}

#[cfg(test)]
#[path = "role_tests.rs"]
mod tests;
