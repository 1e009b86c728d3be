// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deferred cross-peer notification queue.
//!
//! The producer side runs on the transmitting controller: after a
//! successful transfer of an entry that asks for it, a spool file lands
//! in the outbox drop directory. The outbox itself is one of the
//! replicated paths, so the transfer tool carries the spool file to the
//! peer's inbox. The consumer side watches the inbox, pokes the
//! configured services, and deletes each spool file when done.

use pairsync_adapters::{PathWatcher, ServiceManager};
use rand::distr::{Alphanumeric, SampleString};
use pairsync_core::{PathEvent, SyncEntry};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Spool file name shape: `notifyReq_<unix-ts>_<rand6>.json`.
const SPOOL_PREFIX: &str = "notifyReq_";
const SPOOL_SUFFIX: &str = ".json";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to write notify request into {dir}: {source}")]
    Write {
        dir: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to frame notify request: {0}")]
    Frame(#[from] serde_json::Error),
}

/// Queue a notification for `modified` if the entry asks for one.
///
/// Returns the spool file path when a request was written, `None` when
/// the entry has no notification config or the path does not match.
pub fn queue_notification(
    outbox: &Path,
    entry: &SyncEntry,
    modified: &Path,
) -> Result<Option<PathBuf>, NotifyError> {
    let Some(notify) = &entry.notify_sibling else {
        return Ok(None);
    };
    if !notify.matches(modified) {
        return Ok(None);
    }

    let body = json!({
        "ModifiedDataPath": modified,
        "NotifyInfo": notify.request,
    });

    std::fs::create_dir_all(outbox).map_err(|source| NotifyError::Write {
        dir: outbox.to_path_buf(),
        source,
    })?;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let name = format!("{SPOOL_PREFIX}{timestamp}_{}{SPOOL_SUFFIX}", spool_suffix());
    let path = outbox.join(&name);

    // Write-then-rename so the replicating transfer can never pick up a
    // half-written request.
    let tmp = path.with_extension("tmp");
    let write = || -> std::io::Result<()> {
        std::fs::write(&tmp, serde_json::to_vec_pretty(&body)?)?;
        std::fs::rename(&tmp, &path)
    };
    write().map_err(|source| NotifyError::Write {
        dir: outbox.to_path_buf(),
        source,
    })?;

    debug!(
        request = %path.display(),
        path = %modified.display(),
        "notify request queued"
    );
    Ok(Some(path))
}

/// Consume spool files from the inbox until cancelled.
///
/// Requests already present at startup are processed before the watch
/// begins; new arrivals are handled as the transfer tool delivers them.
pub(crate) async fn consume<S: ServiceManager>(
    inbox: PathBuf,
    services: Arc<S>,
    token: CancellationToken,
) {
    if let Err(e) = std::fs::create_dir_all(&inbox) {
        error!(error = %e, inbox = %inbox.display(), "cannot create notify inbox");
        return;
    }

    // Watch before scanning so an arrival between the two is never lost;
    // a request caught by both is simply gone by the second look.
    let mut watcher = match PathWatcher::new(&inbox, true) {
        Ok(w) => w,
        Err(e) => {
            error!(error = %e, "cannot watch notify inbox");
            return;
        }
    };

    process_backlog(&inbox, services.as_ref()).await;

    loop {
        let events = tokio::select! {
            _ = token.cancelled() => return,
            res = watcher.next_events() => match res {
                Ok(events) => events,
                Err(e) => {
                    error!(error = %e, "notify inbox watch failed");
                    return;
                }
            },
        };
        for event in events {
            if let PathEvent::Create { path, .. }
            | PathEvent::MovedIn { path, .. }
            | PathEvent::Write { path } = event
            {
                if is_spool_file(&path) {
                    process_file(&path, services.as_ref()).await;
                }
            }
        }
    }
}

async fn process_backlog<S: ServiceManager>(inbox: &Path, services: &S) {
    let Ok(listing) = std::fs::read_dir(inbox) else {
        return;
    };
    let mut backlog: Vec<PathBuf> = listing
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| is_spool_file(p))
        .collect();
    backlog.sort();
    for path in backlog {
        process_file(&path, services).await;
    }
}

/// Six random alphanumeric characters for unique spool names.
fn spool_suffix() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 6)
}

fn is_spool_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(SPOOL_PREFIX) && n.ends_with(SPOOL_SUFFIX))
}

/// Handle one received request, deleting the spool file afterwards even
/// when individual service actions failed.
async fn process_file<S: ServiceManager>(path: &Path, services: &S) {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        // Already consumed by the backlog scan.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
        Err(e) => {
            error!(error = %e, request = %path.display(), "unreadable notify request dropped");
            remove_spool(path);
            return;
        }
    };
    let request: serde_json::Value = match serde_json::from_str(&text) {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, request = %path.display(), "malformed notify request dropped");
            remove_spool(path);
            return;
        }
    };

    let modified = request
        .get("ModifiedDataPath")
        .and_then(|v| v.as_str())
        .unwrap_or("<unknown>");
    let info = request.get("NotifyInfo").cloned().unwrap_or_default();

    match info.get("Mode").and_then(|v| v.as_str()) {
        Some("Systemd") => {
            let method = match info.get("Method").and_then(|v| v.as_str()) {
                Some("Reload") => "reload",
                _ => "restart",
            };
            let services_list: Vec<String> = info
                .get("NotifyServices")
                .and_then(|v| v.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();

            for service in &services_list {
                let result = if method == "reload" {
                    services.reload_unit(service).await
                } else {
                    services.restart_unit(service).await
                };
                if let Err(e) = result {
                    // One failed unit must not block the others.
                    error!(
                        error = %e,
                        service,
                        method,
                        path = modified,
                        "notify action failed"
                    );
                } else {
                    info!(service, method, path = modified, "service notified");
                }
            }
        }
        Some("DBus") => {
            // Reserved mode; nothing consumes these signals yet.
            warn!(request = %path.display(), "DBus notify mode is not available, dropping request");
        }
        other => {
            error!(mode = ?other, request = %path.display(), "notify request with unknown mode dropped");
        }
    }

    remove_spool(path);
}

fn remove_spool(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(error = %e, request = %path.display(), "failed to remove notify request");
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
