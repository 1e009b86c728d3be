// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk catalogue schema and its conversion into [`SyncEntry`].
//!
//! Field-level problems (unknown direction strings, malformed durations)
//! are logged and defaulted rather than failing the file; only JSON-level
//! breakage rejects a catalogue file.

use pairsync_core::{
    parse_iso8601, NotifyMethod, NotifyMode, NotifySibling, PathFilter, RetryPolicy,
    SyncDirection, SyncEntry, SyncType,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, warn};

const DEFAULT_PERIODICITY: Duration = Duration::from_secs(60);

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CatalogFile {
    #[serde(rename = "Files", default)]
    pub files: Vec<RawEntry>,
    #[serde(rename = "Directories", default)]
    pub directories: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEntry {
    #[serde(rename = "Path")]
    path: PathBuf,
    #[serde(rename = "DestinationPath")]
    dest_path: Option<PathBuf>,
    #[serde(rename = "SyncDirection")]
    direction: Option<String>,
    #[serde(rename = "SyncType")]
    sync_type: Option<String>,
    #[serde(rename = "Periodicity")]
    periodicity: Option<String>,
    #[serde(rename = "RetryAttempts")]
    retry_attempts: Option<u8>,
    #[serde(rename = "RetryInterval")]
    retry_interval: Option<String>,
    #[serde(rename = "ExcludeList")]
    exclude_list: Option<Vec<PathBuf>>,
    #[serde(rename = "IncludeList")]
    include_list: Option<Vec<PathBuf>>,
    #[serde(rename = "NotifySibling")]
    notify_sibling: Option<serde_json::Value>,
}

impl RawEntry {
    pub(crate) fn into_entry(self, is_dir: bool) -> SyncEntry {
        // A symlinked path watches and transfers its target.
        let path = if self.path.is_symlink() {
            std::fs::canonicalize(&self.path).unwrap_or(self.path)
        } else {
            self.path
        };

        let direction = match self.direction.as_deref() {
            None => SyncDirection::default(),
            Some(s) => SyncDirection::from_config_str(s).unwrap_or_else(|| {
                error!(direction = s, path = %path.display(), "unsupported sync direction, using default");
                SyncDirection::default()
            }),
        };

        let sync_type = match self.sync_type.as_deref() {
            None => SyncType::default(),
            Some(s) => SyncType::from_config_str(s).unwrap_or_else(|| {
                error!(sync_type = s, path = %path.display(), "unsupported sync type, using default");
                SyncType::default()
            }),
        };

        let periodicity = match sync_type {
            SyncType::Immediate => None,
            SyncType::Periodic => Some(parse_duration_or(
                self.periodicity.as_deref(),
                DEFAULT_PERIODICITY,
                &path,
            )),
        };

        // Both knobs must be present to override the retry policy.
        let retry = match (self.retry_attempts, &self.retry_interval) {
            (Some(attempts), Some(interval)) => RetryPolicy {
                attempts,
                interval: parse_duration_or(
                    Some(interval.as_str()),
                    RetryPolicy::default().interval,
                    &path,
                ),
            },
            _ => RetryPolicy::default(),
        };

        let exclude = self
            .exclude_list
            .map(|paths| PathFilter::new(&path, paths, false));
        // The lists must be disjoint; a path in both is excluded.
        let include = self.include_list.map(|mut paths| {
            if let Some(exclude) = &exclude {
                paths.retain(|p| {
                    let clash = exclude.paths.contains(p);
                    if clash {
                        warn!(
                            path = %p.display(),
                            entry = %path.display(),
                            "path listed as both include and exclude, excluding"
                        );
                    }
                    !clash
                });
            }
            PathFilter::new(&path, paths, true)
        });

        let notify_sibling = self.notify_sibling.and_then(|value| {
            parse_notify(&value).or_else(|| {
                error!(path = %path.display(), "malformed NotifySibling block ignored");
                None
            })
        });

        SyncEntry {
            path,
            is_dir,
            dest_path: self.dest_path,
            direction,
            sync_type,
            periodicity,
            retry,
            exclude,
            include,
            notify_sibling,
        }
    }
}

fn parse_duration_or(
    value: Option<&str>,
    default: Duration,
    path: &std::path::Path,
) -> Duration {
    match value {
        None => default,
        Some(s) => parse_iso8601(s).unwrap_or_else(|e| {
            warn!(error = %e, path = %path.display(), "bad duration in catalogue, using default");
            default
        }),
    }
}

/// Extract the typed notification config while preserving the raw request
/// payload forwarded to the peer.
fn parse_notify(value: &serde_json::Value) -> Option<NotifySibling> {
    let obj = value.as_object()?;

    let mode = NotifyMode::from_config_str(obj.get("Mode")?.as_str()?)?;
    let method = NotifyMethod::from_config_str(obj.get("Method")?.as_str()?)?;
    let services = obj
        .get("NotifyServices")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let paths = obj.get("NotifyOnPaths").and_then(|v| v.as_array()).map(|arr| {
        arr.iter()
            .filter_map(|v| v.as_str().map(PathBuf::from))
            .collect()
    });

    // The forwarded request drops NotifyOnPaths; it only gates the producer.
    let mut request = value.clone();
    if let Some(map) = request.as_object_mut() {
        map.remove("NotifyOnPaths");
    }

    Some(NotifySibling {
        paths,
        mode,
        method,
        services,
        request,
    })
}
