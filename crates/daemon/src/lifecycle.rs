// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use pairsync_adapters::{
    ErrorReporter, FileRoleProvider, RoleError, ShellTransferRunner, SystemdManager,
};
use pairsync_engine::{ControlState, Engine, EngineConfig, EngineDeps};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Daemon engine with concrete adapter types.
pub type DaemonEngine = Engine<ShellTransferRunner, SystemdManager, FileRoleProvider>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Durable state directory (e.g. /var/lib/pairsync)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Replication catalogue directory
    pub catalog_dir: PathBuf,
    /// Redundancy manager state file
    pub role_file: PathBuf,
    /// Control-property persistence file
    pub persist_path: PathBuf,
    /// Error report directory
    pub reports_dir: PathBuf,
    /// Outgoing notify drop directory (replicated to the peer)
    pub notify_outbox: PathBuf,
    /// Incoming notify drop directory (replicated from the peer)
    pub notify_inbox: PathBuf,
}

impl Config {
    /// Load configuration from the environment-overridable defaults.
    pub fn load() -> Self {
        let state_dir = crate::env::state_dir();
        let run_dir = crate::env::run_dir();

        Self {
            socket_path: run_dir.join("pairsyncd.sock"),
            lock_path: run_dir.join("pairsyncd.pid"),
            log_path: state_dir.join("pairsyncd.log"),
            catalog_dir: crate::env::catalog_dir(),
            role_file: crate::env::role_file(),
            persist_path: state_dir.join("persistence/control.json"),
            reports_dir: state_dir.join("reports"),
            notify_outbox: state_dir.join("notify/outbox"),
            notify_inbox: state_dir.join("notify/inbox"),
            state_dir,
        }
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// The sync engine (shared with the listener)
    pub engine: Arc<DaemonEngine>,
    /// Role provider (shared with the listener for status reporting)
    pub roles: Arc<FileRoleProvider>,
    /// When the daemon started
    pub start_time: Instant,
}

/// Result of daemon startup - includes the state and the bound listener.
pub struct StartupResult {
    pub daemon: DaemonState,
    /// The Unix socket listener to spawn as a task
    pub listener: UnixListener,
}

impl std::fmt::Debug for StartupResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupResult").finish_non_exhaustive()
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Redundancy state unavailable: {0}")]
    Role(#[from] RoleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub fn startup(config: &Config, token: &CancellationToken) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config, token) {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock —
            // those files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

fn startup_inner(
    config: &Config,
    token: &CancellationToken,
) -> Result<StartupResult, LifecycleError> {
    // 1. Create the runtime directory (needed for socket and lock)
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races.
    // Use OpenOptions to avoid truncating the file before we hold the lock,
    // which would wipe the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file (truncate now that we hold the lock)
    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Drop mutability

    // 3. Restore the control surface from its persisted snapshot
    let control = Arc::new(ControlState::restore(&config.persist_path));

    // 4. Consult the redundancy manager; no role source is fatal
    let roles = Arc::new(FileRoleProvider::load(&config.role_file)?);

    // 5. Parse the catalogue (per-file errors are logged and skipped)
    let catalog = pairsync_catalog::load_dir(&config.catalog_dir);
    if catalog.file_errors > 0 {
        warn!(
            errors = catalog.file_errors,
            "some catalogue files failed to parse"
        );
    }
    info!(entries = catalog.entries.len(), "catalogue loaded");

    // 6. Build the engine on the production adapters
    let engine = Arc::new(Engine::new(
        EngineDeps {
            transfer: ShellTransferRunner,
            services: Arc::new(SystemdManager),
            roles: Arc::clone(&roles),
            reporter: ErrorReporter::new(&config.reports_dir),
        },
        EngineConfig {
            notify_outbox: config.notify_outbox.clone(),
            notify_inbox: config.notify_inbox.clone(),
        },
        control,
        catalog.entries,
    ));

    // 7. Remove stale socket and bind (LAST - only after validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // 8. Follow role changes and start the sync loops
    tokio::spawn(Arc::clone(&roles).watch_changes(token.clone()));
    engine.start(token);

    info!("Daemon started");

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            engine,
            roles,
            start_time: Instant::now(),
        },
        listener,
    })
}

impl DaemonState {
    /// Shutdown the daemon gracefully.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Remove socket file (listener task stops when the runtime exits)
        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        // 2. Remove PID file
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 3. Lock file is released automatically when self.lock_file is dropped

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
