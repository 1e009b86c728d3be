// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for the operator CLI.

use pairsync_daemon::protocol::{
    self, ProtocolError, Request, Response, DEFAULT_TIMEOUT,
};
use std::path::PathBuf;
use thiserror::Error;
use tokio::net::UnixStream;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running at {0}")]
    DaemonNotRunning(PathBuf),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Daemon rejected the request: {kind}: {message}")]
    Rejected { kind: String, message: String },
}

/// One-request-per-connection client for the control socket.
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    /// Send one request and wait for the daemon's response.
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|_| ClientError::DaemonNotRunning(self.socket_path.clone()))?;

        let bytes = protocol::encode(request)?;
        tokio::time::timeout(DEFAULT_TIMEOUT, protocol::write_message(&mut stream, &bytes))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let raw = tokio::time::timeout(DEFAULT_TIMEOUT, protocol::read_message(&mut stream))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        Ok(protocol::decode(&raw)?)
    }

    /// Send a request, turning error responses into `ClientError`.
    pub async fn expect_ok(&self, request: &Request) -> Result<Response, ClientError> {
        match self.send(request).await? {
            Response::Error { kind, message } => Err(ClientError::Rejected {
                kind: format!("{kind:?}"),
                message,
            }),
            response => Ok(response),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
