// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator-visible control enums.
//!
//! Both enums persist with an integer underlying value, so the on-disk
//! snapshot stays stable if variant names are ever reworded. Manual serde
//! impls keep that mapping explicit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of an operator-initiated full synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullSyncStatus {
    #[default]
    Idle,
    InProgress,
    Completed,
    Failed,
}

impl FullSyncStatus {
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::InProgress => 1,
            Self::Completed => 2,
            Self::Failed => 3,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::InProgress),
            2 => Some(Self::Completed),
            3 => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for FullSyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        };
        write!(f, "{name}")
    }
}

impl Serialize for FullSyncStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for FullSyncStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid FullSyncStatus value: {value}"))
        })
    }
}

/// Aggregate health of the background sync loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncEventsHealth {
    #[default]
    Ok,
    Paused,
    Critical,
}

impl SyncEventsHealth {
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Paused => 1,
            Self::Critical => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::Paused),
            2 => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for SyncEventsHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "Ok",
            Self::Paused => "Paused",
            Self::Critical => "Critical",
        };
        write!(f, "{name}")
    }
}

impl Serialize for SyncEventsHealth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for SyncEventsHealth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid SyncEventsHealth value: {value}"))
        })
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
