// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pairsync: operator client for pairsyncd.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;

use anyhow::bail;
use clap::{Parser, Subcommand};
use client::DaemonClient;
use pairsync_daemon::protocol::{Request, Response};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pairsync", version, about = "Control the pairsync daemon")]
struct Cli {
    /// Path to the daemon control socket
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the daemon is alive
    Ping,
    /// Show role, control properties, and entry count
    Status,
    /// Start a full synchronization to the sibling controller
    FullSync,
    /// Pause all synchronization
    Disable,
    /// Resume synchronization
    Enable,
    /// Stop the daemon
    Shutdown,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let socket = cli
        .socket
        .unwrap_or_else(|| pairsync_daemon::env::run_dir().join("pairsyncd.sock"));
    let client = DaemonClient::new(socket);

    match cli.command {
        Command::Ping => {
            match client.expect_ok(&Request::Ping).await? {
                Response::Pong => println!("pong"),
                other => bail!("unexpected response: {other:?}"),
            }
        }
        Command::Status => {
            match client.expect_ok(&Request::Status).await? {
                Response::Status(report) => {
                    println!("role:               {}", report.role);
                    println!("redundancy:         {}", on_off(report.redundancy_enabled));
                    println!("sync:               {}", if report.disable { "disabled" } else { "enabled" });
                    println!("full sync status:   {}", report.full_sync_status);
                    println!("sync events health: {}", report.sync_events_health);
                    println!("catalogue entries:  {}", report.entry_count);
                    println!("uptime:             {}s", report.uptime_secs);
                }
                other => bail!("unexpected response: {other:?}"),
            }
        }
        Command::FullSync => {
            client.expect_ok(&Request::StartFullSync).await?;
            println!("full sync started");
        }
        Command::Disable => {
            client
                .expect_ok(&Request::SetDisable { disable: true })
                .await?;
            println!("sync disabled");
        }
        Command::Enable => {
            client
                .expect_ok(&Request::SetDisable { disable: false })
                .await?;
            println!("sync enabled");
        }
        Command::Shutdown => {
            client.expect_ok(&Request::Shutdown).await?;
            println!("shutdown requested");
        }
    }
    Ok(())
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
