// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pairsync-adapters: edges of the daemon.
//!
//! Everything here talks to something outside the process: the kernel's
//! notification interface, the transfer tool, the service manager, the
//! redundancy manager's published state, and the error-report directory.
//! Each adapter has a fake counterpart behind the `test-support` feature.

pub mod report;
pub mod role;
pub mod service;
pub mod transfer;
pub mod watch;

pub use report::ErrorReporter;
pub use role::{FileRoleProvider, RoleError, RoleProvider};
pub use service::{ServiceError, ServiceManager, SystemdManager};
pub use transfer::{CommandOutput, ShellTransferRunner, TransferRunner};
pub use watch::{PathWatcher, WatchError};

#[cfg(any(test, feature = "test-support"))]
pub use role::FakeRoleProvider;
#[cfg(any(test, feature = "test-support"))]
pub use service::FakeServiceManager;
#[cfg(any(test, feature = "test-support"))]
pub use transfer::FakeTransferRunner;
