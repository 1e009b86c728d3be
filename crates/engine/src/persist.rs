// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-safe persistence of the control properties.
//!
//! A single JSON object under a fixed path carries whichever of the three
//! properties have been set. Writes go to a `.tmp` sibling and rename
//! into place so a crash mid-write can never leave a torn snapshot.
//! A missing or corrupt file reads as "no snapshot".

use pairsync_core::{FullSyncStatus, SyncEventsHealth};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// The persisted shape of the control surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlSnapshot {
    #[serde(rename = "Disable", skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    #[serde(rename = "FullSyncStatus", skip_serializing_if = "Option::is_none")]
    pub full_sync_status: Option<FullSyncStatus>,
    #[serde(rename = "SyncEventsHealth", skip_serializing_if = "Option::is_none")]
    pub sync_events_health: Option<SyncEventsHealth>,
}

/// Read the snapshot; missing or unparseable files read as `None`.
pub fn read_snapshot(path: &Path) -> Option<ControlSnapshot> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "cannot read control snapshot");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "corrupt control snapshot ignored");
            None
        }
    }
}

/// Write the snapshot atomically (write to `.tmp`, fsync, rename).
pub fn write_snapshot(path: &Path, snapshot: &ControlSnapshot) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, snapshot)?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
