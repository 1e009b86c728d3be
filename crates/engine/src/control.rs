// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The three operator-visible control properties.
//!
//! Every mutation persists the full snapshot before returning, so a
//! subsequent read from any task observes property and persistence in
//! agreement. Persist failures keep the in-memory value authoritative
//! and only log.

use crate::persist::{self, ControlSnapshot};
use pairsync_core::{FullSyncStatus, SyncEventsHealth};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
struct Props {
    disable: bool,
    full_sync_status: FullSyncStatus,
    sync_events_health: SyncEventsHealth,
}

/// Owner of the control properties and their persistence.
pub struct ControlState {
    props: Mutex<Props>,
    persist_path: PathBuf,
}

impl ControlState {
    /// Start from defaults overlaid with whatever snapshot survives on
    /// disk. Missing or corrupt snapshots fall back to the defaults.
    pub fn restore(persist_path: &Path) -> Self {
        let mut props = Props::default();
        if let Some(snapshot) = persist::read_snapshot(persist_path) {
            if let Some(disable) = snapshot.disable {
                props.disable = disable;
            }
            if let Some(status) = snapshot.full_sync_status {
                props.full_sync_status = status;
            }
            if let Some(health) = snapshot.sync_events_health {
                props.sync_events_health = health;
            }
            info!(
                disable = props.disable,
                full_sync_status = %props.full_sync_status,
                sync_events_health = %props.sync_events_health,
                "control properties restored"
            );
        }
        Self {
            props: Mutex::new(props),
            persist_path: persist_path.to_path_buf(),
        }
    }

    pub fn disable(&self) -> bool {
        self.props.lock().disable
    }

    /// Set `Disable`; returns false when the value is unchanged (the
    /// write is then a no-op, nothing is persisted).
    pub fn set_disable(&self, disable: bool) -> bool {
        let mut props = self.props.lock();
        if props.disable == disable {
            info!(value = disable, "disable property already set");
            return false;
        }
        props.disable = disable;
        self.persist(&props);
        true
    }

    pub fn full_sync_status(&self) -> FullSyncStatus {
        self.props.lock().full_sync_status
    }

    pub fn set_full_sync_status(&self, status: FullSyncStatus) {
        let mut props = self.props.lock();
        if props.full_sync_status == status {
            return;
        }
        info!(status = %status, "full sync status changed");
        props.full_sync_status = status;
        self.persist(&props);
    }

    /// Claim `FullSyncStatus = InProgress` unless a full sync already
    /// holds it. The check and the write happen under one lock hold, so
    /// two concurrent callers can never both claim it.
    pub fn begin_full_sync(&self) -> bool {
        let mut props = self.props.lock();
        if props.full_sync_status == FullSyncStatus::InProgress {
            return false;
        }
        info!(status = %FullSyncStatus::InProgress, "full sync status changed");
        props.full_sync_status = FullSyncStatus::InProgress;
        self.persist(&props);
        true
    }

    pub fn sync_events_health(&self) -> SyncEventsHealth {
        self.props.lock().sync_events_health
    }

    pub fn set_sync_events_health(&self, health: SyncEventsHealth) {
        let mut props = self.props.lock();
        if props.sync_events_health == health {
            return;
        }
        info!(health = %health, "sync events health changed");
        props.sync_events_health = health;
        self.persist(&props);
    }

    /// Current values of all three properties.
    pub fn snapshot(&self) -> ControlSnapshot {
        let props = self.props.lock();
        ControlSnapshot {
            disable: Some(props.disable),
            full_sync_status: Some(props.full_sync_status),
            sync_events_health: Some(props.sync_events_health),
        }
    }

    fn persist(&self, props: &Props) {
        let snapshot = ControlSnapshot {
            disable: Some(props.disable),
            full_sync_status: Some(props.full_sync_status),
            sync_events_health: Some(props.sync_events_health),
        };
        if let Err(e) = persist::write_snapshot(&self.persist_path, &snapshot) {
            warn!(error = %e, path = %self.persist_path.display(), "failed to persist control properties");
        }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
