// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pairsync-engine: the sync engine.
//!
//! Owns the runtime state of every catalogue entry, drives the immediate
//! and periodic loops, serves operator-initiated full syncs, queues and
//! consumes peer notifications, and keeps the operator-visible control
//! state persisted.

pub mod control;
pub mod notify;
pub mod persist;
mod retry;
mod runtime;
mod sync;

pub use control::ControlState;
pub use notify::queue_notification;
pub use persist::ControlSnapshot;
pub use runtime::{
    Engine, EngineConfig, EngineDeps, EntryPhase, EntryState, FullSyncRejection,
};
