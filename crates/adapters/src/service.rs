// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service-manager adapter used by the notification consumer.
//!
//! A reload/restart counts as delivered once the service manager accepts
//! the request; whether the unit then reloads cleanly is its own problem.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// How long one service action may take before it is abandoned.
const ACTION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service action '{action} {service}' failed: {reason}")]
    ActionFailed {
        action: String,
        service: String,
        reason: String,
    },
}

/// Restarts or reloads named services on this controller.
#[async_trait]
pub trait ServiceManager: Send + Sync + 'static {
    async fn reload_unit(&self, service: &str) -> Result<(), ServiceError>;
    async fn restart_unit(&self, service: &str) -> Result<(), ServiceError>;
}

/// The production adapter: drives systemd through `systemctl`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemdManager;

impl SystemdManager {
    async fn systemctl(&self, action: &str, service: &str) -> Result<(), ServiceError> {
        debug!(action, service, "issuing service action");
        let fail = |reason: String| ServiceError::ActionFailed {
            action: action.to_string(),
            service: service.to_string(),
            reason,
        };

        let mut cmd = Command::new("systemctl");
        cmd.arg(action).arg(service);

        // A unit wedged in its reload must not wedge the consumer with
        // it; dropping the abandoned output future kills the child.
        let output = match tokio::time::timeout(ACTION_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(io_err)) => return Err(fail(io_err.to_string())),
            Err(_elapsed) => {
                return Err(fail(format!(
                    "timed out after {}s",
                    ACTION_TIMEOUT.as_secs()
                )))
            }
        };

        if output.status.success() {
            Ok(())
        } else {
            Err(fail(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

#[async_trait]
impl ServiceManager for SystemdManager {
    async fn reload_unit(&self, service: &str) -> Result<(), ServiceError> {
        self.systemctl("reload", service).await
    }

    async fn restart_unit(&self, service: &str) -> Result<(), ServiceError> {
        self.systemctl("restart", service).await
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeServiceManager;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    /// Records actions instead of touching the service manager.
    #[derive(Debug, Default)]
    pub struct FakeServiceManager {
        actions: Mutex<Vec<(String, String)>>,
        failing: Mutex<HashSet<String>>,
    }

    impl FakeServiceManager {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every action against `service` fail.
        pub fn fail_service(&self, service: &str) {
            self.failing.lock().insert(service.to_string());
        }

        /// `(action, service)` pairs in invocation order.
        pub fn actions(&self) -> Vec<(String, String)> {
            self.actions.lock().clone()
        }

        fn record(&self, action: &str, service: &str) -> Result<(), ServiceError> {
            self.actions
                .lock()
                .push((action.to_string(), service.to_string()));
            if self.failing.lock().contains(service) {
                return Err(ServiceError::ActionFailed {
                    action: action.to_string(),
                    service: service.to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ServiceManager for FakeServiceManager {
        async fn reload_unit(&self, service: &str) -> Result<(), ServiceError> {
            self.record("reload", service)
        }

        async fn restart_unit(&self, service: &str) -> Result<(), ServiceError> {
            self.record("restart", service)
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
