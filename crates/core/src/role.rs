// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller role as published by the external redundancy manager.

use crate::entry::SyncDirection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The local controller's position in the redundant pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Role {
    Active,
    Passive,
    #[default]
    Unknown,
}

impl Role {
    /// Whether this role transmits entries configured with `direction`.
    pub fn transmits(&self, direction: SyncDirection) -> bool {
        match direction {
            SyncDirection::Active2Passive => *self == Role::Active,
            SyncDirection::Passive2Active => *self == Role::Passive,
            SyncDirection::Bidirectional => matches!(self, Role::Active | Role::Passive),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "Active",
            Self::Passive => "Passive",
            Self::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

/// Snapshot of the redundancy manager's published state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedundancyState {
    #[serde(rename = "Role", default)]
    pub role: Role,
    #[serde(rename = "RedundancyEnabled", default)]
    pub redundancy_enabled: bool,
    #[serde(rename = "PeerAddress", default)]
    pub peer_address: Option<String>,
    #[serde(rename = "PeerReachable", default = "default_reachable")]
    pub peer_reachable: bool,
}

fn default_reachable() -> bool {
    true
}

impl Default for RedundancyState {
    fn default() -> Self {
        Self {
            role: Role::Unknown,
            redundancy_enabled: false,
            peer_address: None,
            peer_reachable: true,
        }
    }
}

#[cfg(test)]
#[path = "role_tests.rs"]
mod tests;
