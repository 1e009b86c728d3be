// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The catalogue entry: one file or directory kept in sync across the pair.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which role transmits this entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncDirection {
    #[default]
    Active2Passive,
    Passive2Active,
    Bidirectional,
}

impl SyncDirection {
    /// Parse the catalogue spelling of a direction.
    pub fn from_config_str(value: &str) -> Option<Self> {
        match value {
            "Active2Passive" => Some(Self::Active2Passive),
            "Passive2Active" => Some(Self::Passive2Active),
            "Bidirectional" => Some(Self::Bidirectional),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active2Passive => "Active2Passive",
            Self::Passive2Active => "Passive2Active",
            Self::Bidirectional => "Bidirectional",
        }
    }
}

/// Which engine loop drives this entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncType {
    #[default]
    Immediate,
    Periodic,
}

impl SyncType {
    pub fn from_config_str(value: &str) -> Option<Self> {
        match value {
            "Immediate" => Some(Self::Immediate),
            "Periodic" => Some(Self::Periodic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "Immediate",
            Self::Periodic => "Periodic",
        }
    }
}

/// Per-entry retry preference for failed transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total transfer attempts before the entry is declared failing.
    pub attempts: u8,
    /// Delay between attempts.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            interval: Duration::from_secs(1),
        }
    }
}

/// How the peer should be poked after a successful transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyMode {
    DBus,
    Systemd,
}

impl NotifyMode {
    pub fn from_config_str(value: &str) -> Option<Self> {
        match value {
            "DBus" => Some(Self::DBus),
            "Systemd" => Some(Self::Systemd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyMethod {
    Reload,
    Restart,
}

impl NotifyMethod {
    pub fn from_config_str(value: &str) -> Option<Self> {
        match value {
            "Reload" => Some(Self::Reload),
            "Restart" => Some(Self::Restart),
            _ => None,
        }
    }
}

/// Post-transfer peer notification request attached to an entry.
///
/// `request` holds the raw JSON object forwarded verbatim to the peer
/// (minus `NotifyOnPaths`, which only gates the local producer); unknown
/// keys survive the trip so the consumer side owns their interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifySibling {
    /// Only fire when the modified path falls under one of these.
    pub paths: Option<Vec<PathBuf>>,
    pub mode: NotifyMode,
    pub method: NotifyMethod,
    pub services: Vec<String>,
    pub request: serde_json::Value,
}

impl NotifySibling {
    /// Whether a modification at `path` should produce a notification.
    pub fn matches(&self, path: &Path) -> bool {
        match &self.paths {
            None => true,
            Some(paths) => paths.iter().any(|p| path.starts_with(p)),
        }
    }
}

/// An include or exclude list together with its transfer-tool rendering.
///
/// The filter fragment is framed once at construction, with each listed
/// path made relative to the entry root so the transfer tool can anchor
/// it at the transfer root. Paths outside the root are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathFilter {
    pub paths: Vec<PathBuf>,
    pub fragment: String,
}

impl PathFilter {
    /// Frame `--filter='<sign>/ /<relative>'` fragments for the given paths.
    pub fn new(root: &Path, paths: Vec<PathBuf>, include: bool) -> Self {
        let sign = if include { '+' } else { '-' };
        let fragment = paths
            .iter()
            .filter_map(|p| p.strip_prefix(root).ok())
            .map(|rel| format!("--filter='{sign}/ /{}'", rel.display()))
            .collect::<Vec<_>>()
            .join(" ");
        Self { paths, fragment }
    }
}

/// One synchronizable file or directory from the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEntry {
    /// Absolute path on the local controller; unique across the catalogue.
    pub path: PathBuf,
    /// Whether `path` designates a directory.
    pub is_dir: bool,
    /// Destination root on the peer; `None` mirrors `path` verbatim.
    pub dest_path: Option<PathBuf>,
    pub direction: SyncDirection,
    pub sync_type: SyncType,
    /// Interval between periodic attempts; present iff `sync_type` is Periodic.
    pub periodicity: Option<Duration>,
    pub retry: RetryPolicy,
    pub exclude: Option<PathFilter>,
    pub include: Option<PathFilter>,
    pub notify_sibling: Option<NotifySibling>,
}

impl SyncEntry {
    /// Combined transfer-tool filter fragment for this entry, includes first.
    pub fn filter_fragment(&self) -> String {
        let mut parts = Vec::new();
        if let Some(include) = &self.include {
            if !include.fragment.is_empty() {
                parts.push(include.fragment.as_str());
            }
        }
        if let Some(exclude) = &self.exclude {
            if !exclude.fragment.is_empty() {
                parts.push(exclude.fragment.as_str());
            }
        }
        parts.join(" ")
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
