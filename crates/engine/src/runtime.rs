// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine: one task per catalogue entry, plus full-sync dispatch.
//!
//! Immediate entries block on their path watcher and turn event batches
//! into transfer operations; periodic entries sleep their configured
//! interval between whole-entry transfers. Full sync walks every entry
//! eligible for the local role. A per-entry async gate keeps transfers
//! for one entry from ever overlapping, and the `in_progress` path set
//! drops duplicate operations while one is in flight.

use crate::control::ControlState;
use crate::notify;
use crate::retry::{self, SyncResult};
use pairsync_adapters::{ErrorReporter, PathWatcher, RoleProvider, ServiceManager, TransferRunner};
use pairsync_core::{
    FullSyncStatus, Operation, PathEvent, SyncEntry, SyncEventsHealth, SyncType,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Cadence used when an immediate entry falls back after watch setup fails.
const FALLBACK_PERIOD: Duration = Duration::from_secs(60);

/// Lifecycle of one entry's sync loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPhase {
    /// Created; role and redundancy not consulted yet.
    Idle,
    /// Eligible and waiting for work.
    Armed,
    /// A transfer is in flight.
    Running,
    /// Last attempt succeeded (transient, returns to Armed).
    Succeeded,
    /// Last attempt failed after exhausting retries.
    Failing,
    /// The loop has exited.
    Dead,
}

/// A catalogue entry together with its runtime state.
pub struct EntryState {
    entry: SyncEntry,
    phase: Mutex<EntryPhase>,
    /// Paths with a transfer in flight; duplicates arriving meanwhile
    /// are dropped.
    in_progress: Mutex<HashSet<PathBuf>>,
    /// Serializes transfers for this entry across loops and full sync.
    gate: tokio::sync::Mutex<()>,
}

impl EntryState {
    fn new(entry: SyncEntry) -> Self {
        Self {
            entry,
            phase: Mutex::new(EntryPhase::Idle),
            in_progress: Mutex::new(HashSet::new()),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn entry(&self) -> &SyncEntry {
        &self.entry
    }

    pub fn phase(&self) -> EntryPhase {
        *self.phase.lock()
    }

    fn set_phase(&self, phase: EntryPhase) {
        *self.phase.lock() = phase;
    }

    pub fn in_progress_paths(&self) -> Vec<PathBuf> {
        self.in_progress.lock().iter().cloned().collect()
    }
}

/// Reasons `StartFullSync` is rejected at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FullSyncRejection {
    #[error("SyncDisabled")]
    SyncDisabled,
    #[error("SiblingBMCNotAvailable")]
    SiblingBmcNotAvailable,
    #[error("FullSyncInProgress")]
    FullSyncInProgress,
}

/// External collaborators the engine drives.
pub struct EngineDeps<T, S, R> {
    pub transfer: T,
    pub services: Arc<S>,
    pub roles: Arc<R>,
    pub reporter: ErrorReporter,
}

/// Engine path configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Drop directory for outgoing notify requests (replicated to peer).
    pub notify_outbox: PathBuf,
    /// Drop directory where the peer's requests arrive locally.
    pub notify_inbox: PathBuf,
}

/// The sync engine.
pub struct Engine<T, S, R> {
    transfer: T,
    services: Arc<S>,
    roles: Arc<R>,
    reporter: ErrorReporter,
    config: EngineConfig,
    control: Arc<ControlState>,
    entries: Vec<Arc<EntryState>>,
}

impl<T, S, R> Engine<T, S, R>
where
    T: TransferRunner,
    S: ServiceManager,
    R: RoleProvider,
{
    pub fn new(
        deps: EngineDeps<T, S, R>,
        config: EngineConfig,
        control: Arc<ControlState>,
        entries: Vec<SyncEntry>,
    ) -> Self {
        Self {
            transfer: deps.transfer,
            services: deps.services,
            roles: deps.roles,
            reporter: deps.reporter,
            config,
            control,
            entries: entries
                .into_iter()
                .map(|entry| Arc::new(EntryState::new(entry)))
                .collect(),
        }
    }

    pub fn control(&self) -> &Arc<ControlState> {
        &self.control
    }

    /// The transfer runner (fakes need it in tests).
    pub fn transfer(&self) -> &T {
        &self.transfer
    }

    pub fn entries(&self) -> &[Arc<EntryState>] {
        &self.entries
    }

    /// Spawn the per-entry loops and the notification consumer.
    pub fn start(self: &Arc<Self>, token: &CancellationToken) {
        for entry in &self.entries {
            let engine = Arc::clone(self);
            let entry = Arc::clone(entry);
            let task_token = token.clone();
            match entry.entry.sync_type {
                SyncType::Immediate => {
                    tokio::spawn(async move { engine.immediate_task(entry, task_token).await });
                }
                SyncType::Periodic => {
                    tokio::spawn(async move {
                        let period =
                            entry.entry.periodicity.unwrap_or(FALLBACK_PERIOD);
                        engine.periodic_task(entry, period, task_token).await
                    });
                }
            }
        }

        tokio::spawn(notify::consume(
            self.config.notify_inbox.clone(),
            Arc::clone(&self.services),
            token.clone(),
        ));

        info!(entries = self.entries.len(), "sync engine started");
    }

    /// Whether the local role currently transmits this entry.
    fn role_transmits(&self, entry: &SyncEntry) -> bool {
        self.roles.redundancy_enabled() && self.roles.role().transmits(entry.direction)
    }

    /// Validate a `StartFullSync` request and claim the in-progress
    /// status in one step.
    ///
    /// On `Ok` the status is already `InProgress`, so a second caller
    /// arriving before the sync task first runs is still rejected;
    /// the caller must follow up with [`Engine::run_full_sync`].
    pub fn try_begin_full_sync(&self) -> Result<(), FullSyncRejection> {
        if self.control.disable() {
            error!("sync is disabled, cannot start full sync");
            return Err(FullSyncRejection::SyncDisabled);
        }
        if !self.roles.peer_reachable() {
            error!("sibling controller is not reachable, cannot start full sync");
            return Err(FullSyncRejection::SiblingBmcNotAvailable);
        }
        if !self.control.begin_full_sync() {
            error!("full sync already in progress");
            return Err(FullSyncRejection::FullSyncInProgress);
        }
        Ok(())
    }

    /// One-shot transfer of every entry eligible for the local role.
    ///
    /// `Completed` iff every eligible entry succeeded; a failing entry
    /// does not stop the rest.
    pub async fn run_full_sync(self: Arc<Self>, token: CancellationToken) {
        self.control
            .set_full_sync_status(FullSyncStatus::InProgress);
        info!("full sync started");

        let mut all_ok = true;
        for entry in &self.entries {
            if token.is_cancelled() {
                all_ok = false;
                break;
            }
            if !self.role_transmits(&entry.entry) {
                continue;
            }
            all_ok &= self.sync_whole_entry(entry, &token).await;
        }

        let status = if all_ok {
            FullSyncStatus::Completed
        } else {
            FullSyncStatus::Failed
        };
        info!(status = %status, "full sync finished");
        self.control.set_full_sync_status(status);
    }

    /// Event-driven loop for one immediate entry.
    async fn immediate_task(
        self: Arc<Self>,
        entry: Arc<EntryState>,
        token: CancellationToken,
    ) {
        let mut watcher = match PathWatcher::new(&entry.entry.path, entry.entry.is_dir) {
            Ok(watcher) => watcher,
            Err(e) => {
                // The entry still replicates, just on a timer.
                error!(
                    error = %e,
                    path = %entry.entry.path.display(),
                    "watch setup failed, falling back to periodic sync"
                );
                self.report_entry_failure(&entry.entry, "WatchSetup", &e.to_string(), None);
                return self.periodic_task(entry, FALLBACK_PERIOD, token).await;
            }
        };
        entry.set_phase(EntryPhase::Armed);
        debug!(path = %entry.entry.path.display(), "immediate sync loop armed");

        loop {
            let events = tokio::select! {
                _ = token.cancelled() => break,
                result = watcher.next_events() => match result {
                    Ok(events) => events,
                    Err(e) => {
                        error!(error = %e, path = %entry.entry.path.display(), "watch failed, loop exiting");
                        self.report_entry_failure(&entry.entry, "WatchSetup", &e.to_string(), None);
                        break;
                    }
                },
            };

            if self.control.disable() {
                debug!(path = %entry.entry.path.display(), "sync disabled, dropping events");
                continue;
            }
            if !self.role_transmits(&entry.entry) {
                debug!(path = %entry.entry.path.display(), "local role does not transmit, dropping events");
                continue;
            }

            for op in coalesce_operations(&events, &entry.entry) {
                self.run_operation(&entry, op, &token).await;
            }
        }
        entry.set_phase(EntryPhase::Dead);
    }

    /// Timer-driven loop for one periodic entry.
    ///
    /// The interval runs from end of one attempt to start of the next;
    /// drift is not corrected.
    async fn periodic_task(
        self: Arc<Self>,
        entry: Arc<EntryState>,
        period: Duration,
        token: CancellationToken,
    ) {
        entry.set_phase(EntryPhase::Armed);
        debug!(path = %entry.entry.path.display(), ?period, "periodic sync loop armed");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(period) => {}
            }
            if self.control.disable() {
                continue;
            }
            if !self.role_transmits(&entry.entry) {
                continue;
            }
            self.sync_whole_entry(&entry, &token).await;
        }
        entry.set_phase(EntryPhase::Dead);
    }

    /// Transfer one event-derived operation.
    async fn run_operation(
        &self,
        entry: &Arc<EntryState>,
        op: Operation,
        token: &CancellationToken,
    ) {
        let path = op.path().to_path_buf();
        {
            let mut in_progress = entry.in_progress.lock();
            if !in_progress.insert(path.clone()) {
                debug!(path = %path.display(), "transfer already in flight, dropping duplicate");
                return;
            }
        }

        let _gate = entry.gate.lock().await;
        entry.set_phase(EntryPhase::Running);
        let result = retry::sync_with_retry(
            &self.transfer,
            &entry.entry,
            Some(&op),
            self.roles.peer_address().as_deref(),
            token,
        )
        .await;
        entry.in_progress.lock().remove(&path);

        self.finish_attempt(entry, &path, result);
    }

    /// Transfer the entry as a whole (periodic tick, full sync).
    async fn sync_whole_entry(
        &self,
        entry: &Arc<EntryState>,
        token: &CancellationToken,
    ) -> bool {
        let path = entry.entry.path.clone();
        let _gate = entry.gate.lock().await;
        entry.in_progress.lock().insert(path.clone());
        entry.set_phase(EntryPhase::Running);

        let result = retry::sync_with_retry(
            &self.transfer,
            &entry.entry,
            None,
            self.roles.peer_address().as_deref(),
            token,
        )
        .await;
        entry.in_progress.lock().remove(&path);

        self.finish_attempt(entry, &path, result)
    }

    /// Apply the outcome of one logical sync to entry and health state.
    fn finish_attempt(
        &self,
        entry: &Arc<EntryState>,
        path: &Path,
        result: SyncResult,
    ) -> bool {
        if result.ok {
            entry.set_phase(EntryPhase::Succeeded);
            self.queue_notification(&entry.entry, path);
            entry.set_phase(EntryPhase::Armed);
            return true;
        }

        entry.set_phase(EntryPhase::Failing);
        self.control
            .set_sync_events_health(SyncEventsHealth::Critical);
        self.report_entry_failure(
            &entry.entry,
            "TransferFailed",
            "transfer failed after exhausting retries",
            Some(&result.output),
        );
        false
    }

    fn queue_notification(&self, entry: &SyncEntry, modified: &Path) {
        match notify::queue_notification(&self.config.notify_outbox, entry, modified) {
            Ok(Some(request)) => {
                debug!(request = %request.display(), "peer notification queued")
            }
            Ok(None) => {}
            // Not retried; the data itself is already across.
            Err(e) => error!(error = %e, "failed to queue peer notification"),
        }
    }

    fn report_entry_failure(
        &self,
        entry: &SyncEntry,
        kind: &str,
        message: &str,
        capture: Option<&str>,
    ) {
        let mut details = BTreeMap::new();
        details.insert("Path".to_string(), entry.path.display().to_string());
        details.insert(
            "SyncDirection".to_string(),
            entry.direction.as_str().to_string(),
        );
        details.insert("SyncType".to_string(), entry.sync_type.as_str().to_string());
        self.reporter.report(kind, message, details, capture);
    }

    /// React to a `Disable` flip: pause or resume health, leaving
    /// `Critical` sticky.
    pub fn disable_changed(&self, disable: bool) {
        if self.control.sync_events_health() != SyncEventsHealth::Critical {
            self.control.set_sync_events_health(if disable {
                SyncEventsHealth::Paused
            } else {
                SyncEventsHealth::Ok
            });
        }
        if disable {
            warn!("sync events paused by operator");
        } else {
            info!("sync events resumed by operator");
        }
    }
}

/// Collapse an event batch into unique operations, respecting the
/// entry's include/exclude lists.
fn coalesce_operations(events: &[PathEvent], entry: &SyncEntry) -> Vec<Operation> {
    let mut seen: HashSet<(bool, PathBuf)> = HashSet::new();
    let mut ops = Vec::new();
    for event in events {
        let op = Operation::from_event(event);
        if !entry_allows(entry, op.path()) {
            debug!(path = %op.path().display(), "path filtered out by include/exclude lists");
            continue;
        }
        if seen.insert((op.is_delete(), op.path().to_path_buf())) {
            ops.push(op);
        }
    }
    ops
}

/// Whether the entry's filter lists let this path through.
fn entry_allows(entry: &SyncEntry, path: &Path) -> bool {
    if let Some(exclude) = &entry.exclude {
        if exclude.paths.iter().any(|p| path.starts_with(p)) {
            return false;
        }
    }
    if let Some(include) = &entry.include {
        if path != entry.path
            && !include
                .paths
                .iter()
                .any(|p| path.starts_with(p) || p.starts_with(path))
        {
            return false;
        }
    }
    true
}

#[cfg(test)]
#[path = "runtime_tests/mod.rs"]
mod tests;
