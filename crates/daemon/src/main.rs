// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pairsyncd
//!
//! Keeps the configured catalogue of files and directories synchronized
//! with the sibling controller.
//!
//! Architecture:
//! - Listener task: control socket I/O (status, disable, full sync)
//! - Engine tasks: one loop per catalogue entry plus the notify consumer
//!
//! Everything multiplexes on a single-threaded runtime; tasks only yield
//! at await points, so control-property updates are never interleaved.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use pairsync_daemon::lifecycle::{self, Config, LifecycleError, StartupResult};
use pairsync_daemon::listener::{ListenCtx, Listener};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("pairsyncd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("pairsyncd {}", env!("CARGO_PKG_VERSION"));
                println!("Replicates catalogued data between paired management controllers");
                println!();
                println!("USAGE:");
                println!("    pairsyncd");
                println!();
                println!("The daemon reads its catalogue from the configured catalogue");
                println!("directory and serves operator commands on a Unix socket; use");
                println!("the `pairsync` client to talk to it.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: pairsyncd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load();

    // Set up logging
    let _log_guard = setup_logging(&config)?;

    info!("Starting pairsyncd");

    // Cancellation fans out to every engine task.
    let token = CancellationToken::new();

    let StartupResult {
        mut daemon,
        listener: unix_listener,
    } = match lifecycle::startup(&config, &token) {
        Ok(result) => result,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("pairsyncd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            return Err(e.into());
        }
    };

    // Shutdown signal from the listener (not persisted anywhere).
    let shutdown_notify = Arc::new(Notify::new());

    // Spawn listener task
    let ctx = Arc::new(ListenCtx {
        engine: Arc::clone(&daemon.engine),
        roles: Arc::clone(&daemon.roles),
        start_time: daemon.start_time,
        shutdown: Arc::clone(&shutdown_notify),
        token: token.clone(),
    });
    tokio::spawn(Listener::new(unix_listener, ctx).run());

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(
        "Daemon ready, listening on {}",
        config.socket_path.display()
    );

    // Signal ready for parent process (e.g., systemd, client waiting for startup)
    println!("READY");

    tokio::select! {
        _ = shutdown_notify.notified() => {
            info!("Shutdown requested via command");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    // Every loop observes the cancellation at its next suspension point;
    // transfers in flight finish naturally.
    token.cancel();
    daemon.shutdown()?;
    info!("Daemon stopped");
    Ok(())
}

/// Install the tracing subscriber with a non-blocking file writer.
fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
