// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for the control socket.
//!
//! Accepts connections and answers one request per connection without
//! blocking the sync loops. `StartFullSync` is validated inline and then
//! runs as its own task; the response only reports acceptance.

use std::sync::Arc;
use std::time::Instant;

use pairsync_adapters::{FileRoleProvider, RoleProvider};
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::lifecycle::DaemonEngine;
use crate::protocol::{self, ErrorKind, Request, Response, StatusReport, DEFAULT_TIMEOUT};

/// Shared daemon context for all request handlers.
pub struct ListenCtx {
    pub engine: Arc<DaemonEngine>,
    pub roles: Arc<FileRoleProvider>,
    pub start_time: Instant,
    pub shutdown: Arc<Notify>,
    pub token: CancellationToken,
}

/// Listener task for accepting socket connections.
pub struct Listener {
    socket: UnixListener,
    ctx: Arc<ListenCtx>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

impl Listener {
    pub fn new(socket: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { socket, ctx }
    }

    /// Run the listener loop until shutdown, spawning a task per connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            match e {
                                ConnectionError::Protocol(
                                    protocol::ProtocolError::ConnectionClosed,
                                ) => debug!("Client disconnected"),
                                ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
                                    warn!("Connection timeout")
                                }
                                _ => error!("Connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(stream: UnixStream, ctx: &ListenCtx) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;
    info!(request = ?request, "received request");

    let response = handle_request(request, ctx);
    debug!("Sending response: {:?}", response);
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Status => {
            let control = ctx.engine.control().snapshot();
            Response::Status(StatusReport {
                role: ctx.roles.role().to_string(),
                redundancy_enabled: ctx.roles.redundancy_enabled(),
                disable: control.disable.unwrap_or(false),
                full_sync_status: control
                    .full_sync_status
                    .unwrap_or_default()
                    .to_string(),
                sync_events_health: control
                    .sync_events_health
                    .unwrap_or_default()
                    .to_string(),
                entry_count: ctx.engine.entries().len(),
                uptime_secs: ctx.start_time.elapsed().as_secs(),
            })
        }

        // The gate claims InProgress before the response goes out, so a
        // second request racing this one observes it and is rejected.
        Request::StartFullSync => match ctx.engine.try_begin_full_sync() {
            Ok(()) => {
                let engine = Arc::clone(&ctx.engine);
                let token = ctx.token.clone();
                tokio::spawn(engine.run_full_sync(token));
                Response::Ok
            }
            Err(rejection) => Response::Error {
                kind: ErrorKind::from(rejection),
                message: rejection.to_string(),
            },
        },

        Request::SetDisable { disable } => {
            if ctx.engine.control().set_disable(disable) {
                ctx.engine.disable_changed(disable);
            }
            Response::Ok
        }

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::Ok
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
