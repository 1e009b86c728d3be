// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs the external transfer tool and captures its combined output.
//!
//! The child gets a single anonymous pipe: stdout and stderr are both
//! duplicated onto the write end, so the parent reads one interleaved
//! stream in write order. The parent's copies of the write end close at
//! spawn time, guaranteeing EOF once the child exits.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::net::unix::pipe;
use tokio::process::Command;
use tracing::{debug, error};

/// Exit code reported when the tool could not be spawned or reaped.
pub const SPAWN_FAILED: i32 = -1;

/// Result of one transfer-tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// The child's exit code, or [`SPAWN_FAILED`] if it never ran or was
    /// killed by a signal.
    pub exit_code: i32,
    /// Interleaved stdout + stderr.
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    fn spawn_failed() -> Self {
        Self {
            exit_code: SPAWN_FAILED,
            output: String::new(),
        }
    }
}

/// Executes transfer command lines.
#[async_trait]
pub trait TransferRunner: Send + Sync + 'static {
    async fn execute(&self, command: &str) -> CommandOutput;
}

/// The production runner: `/bin/sh -c <command>` with piped output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellTransferRunner;

#[async_trait]
impl TransferRunner for ShellTransferRunner {
    async fn execute(&self, command: &str) -> CommandOutput {
        debug!(command, "executing transfer command");

        let (tx, rx) = match pipe::pipe() {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "failed to create pipe for transfer command");
                return CommandOutput::spawn_failed();
            }
        };

        // Move the write end out of the async registration so it can be
        // handed to the child as plain fds (stdout + a dup for stderr).
        let write_fd = match tx.into_blocking_fd() {
            Ok(fd) => fd,
            Err(e) => {
                error!(error = %e, "failed to detach pipe write end");
                return CommandOutput::spawn_failed();
            }
        };
        let stderr_fd = match write_fd.try_clone() {
            Ok(fd) => fd,
            Err(e) => {
                error!(error = %e, "failed to duplicate pipe write end");
                return CommandOutput::spawn_failed();
            }
        };

        // The Command temporary (and with it the parent's copies of the
        // write end) drops at the end of this statement; without that the
        // read loop below would never see EOF.
        let child = Command::new("/bin/sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::from(write_fd))
            .stderr(Stdio::from(stderr_fd))
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                error!(error = %e, "failed to spawn transfer command");
                return CommandOutput::spawn_failed();
            }
        };

        let output = drain_pipe(rx).await;

        // Reap the child; EOF on the pipe means it is exiting or has exited.
        let exit_code = match child.wait().await {
            Ok(status) => match status.code() {
                Some(code) => code,
                None => {
                    error!(?status, "transfer command terminated by signal");
                    SPAWN_FAILED
                }
            },
            Err(e) => {
                error!(error = %e, "failed to reap transfer command");
                SPAWN_FAILED
            }
        };

        CommandOutput { exit_code, output }
    }
}

/// Accumulate everything the child writes until EOF or a hard read error.
async fn drain_pipe(rx: pipe::Receiver) -> String {
    let mut collected = Vec::new();
    let mut buffer = [0u8; 512];

    loop {
        if let Err(e) = rx.readable().await {
            error!(error = %e, "pipe readiness wait failed");
            break;
        }
        match rx.try_read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => collected.extend_from_slice(&buffer[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => {
                error!(error = %e, "read from transfer pipe failed");
                break;
            }
        }
    }

    String::from_utf8_lossy(&collected).into_owned()
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeTransferRunner;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    type Handler = dyn Fn(&str) -> CommandOutput + Send + Sync;

    /// Scripted transfer runner for tests.
    ///
    /// Returns queued results in order (then the default), records every
    /// command line, and optionally delegates to a handler closure for
    /// tests that want real filesystem effects.
    #[derive(Default)]
    pub struct FakeTransferRunner {
        results: Mutex<VecDeque<CommandOutput>>,
        commands: Mutex<Vec<String>>,
        handler: Option<Box<Handler>>,
    }

    impl FakeTransferRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// A runner whose every invocation is served by `handler`.
        pub fn with_handler(
            handler: impl Fn(&str) -> CommandOutput + Send + Sync + 'static,
        ) -> Self {
            Self {
                results: Mutex::new(VecDeque::new()),
                commands: Mutex::new(Vec::new()),
                handler: Some(Box::new(handler)),
            }
        }

        /// Queue the result for the next unscripted invocation.
        pub fn push_result(&self, exit_code: i32, output: &str) {
            self.results.lock().push_back(CommandOutput {
                exit_code,
                output: output.to_string(),
            });
        }

        /// Every command line executed so far.
        pub fn commands(&self) -> Vec<String> {
            self.commands.lock().clone()
        }

        pub fn invocation_count(&self) -> usize {
            self.commands.lock().len()
        }
    }

    #[async_trait]
    impl TransferRunner for FakeTransferRunner {
        async fn execute(&self, command: &str) -> CommandOutput {
            self.commands.lock().push(command.to_string());
            if let Some(result) = self.results.lock().pop_front() {
                return result;
            }
            if let Some(handler) = &self.handler {
                return handler(command);
            }
            CommandOutput {
                exit_code: 0,
                output: String::new(),
            }
        }
    }
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
