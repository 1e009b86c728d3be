// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

fn path_var(var: &str, default: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

/// Durable state: persistence snapshot, error reports, notify drops.
pub fn state_dir() -> PathBuf {
    path_var("PAIRSYNC_STATE_DIR", "/var/lib/pairsync")
}

/// Runtime state: socket, pid file, daemon log.
pub fn run_dir() -> PathBuf {
    path_var("PAIRSYNC_RUN_DIR", "/run/pairsync")
}

/// The replication catalogue directory.
pub fn catalog_dir() -> PathBuf {
    path_var("PAIRSYNC_CATALOG_DIR", "/etc/pairsync/catalog.d")
}

/// State file published by the redundancy manager.
pub fn role_file() -> PathBuf {
    path_var("PAIRSYNC_ROLE_FILE", "/run/pairsync/redundancy.json")
}
