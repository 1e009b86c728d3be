// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry controller wrapping one logical sync in attempts and fallbacks.
//!
//! Exit code 24 ("some source files vanished") is recoverable: the
//! vanished path is pulled out of the tool's output and the transfer is
//! re-issued from the nearest existing ancestor, at most once per
//! attempt and without consuming one. Every other non-zero exit consumes
//! an attempt and sleeps the configured interval before the next.

use crate::sync::{TransferPlan, VANISHED_EXIT_CODE};
use pairsync_core::{nearest_existing_parent, Operation, SyncEntry};
use pairsync_adapters::TransferRunner;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of one logical sync, after retries.
#[derive(Debug)]
pub(crate) struct SyncResult {
    pub ok: bool,
    /// Transfer-tool invocations spent, fallbacks included.
    pub invocations: u32,
    /// Combined output of the last invocation.
    pub output: String,
}

/// Run one logical sync through the retry policy.
pub(crate) async fn sync_with_retry<T: TransferRunner>(
    runner: &T,
    entry: &SyncEntry,
    op: Option<&Operation>,
    peer: Option<&str>,
    token: &CancellationToken,
) -> SyncResult {
    let retry = entry.retry;
    let mut attempt: u8 = 0;
    let mut invocations: u32 = 0;
    let mut src_override: Option<PathBuf> = None;
    let mut fell_back_this_attempt = false;

    loop {
        let plan = TransferPlan {
            entry,
            op,
            src_override: src_override.as_deref(),
            peer,
        };
        let source = plan.source();
        let result = runner.execute(&plan.command()).await;
        invocations += 1;

        if result.success() {
            return SyncResult {
                ok: true,
                invocations,
                output: result.output,
            };
        }

        if result.exit_code == VANISHED_EXIT_CODE && !fell_back_this_attempt {
            if let Some(fallback) = vanished_fallback(&result.output, &source) {
                debug!(
                    from = %source.display(),
                    to = %fallback.display(),
                    "source vanished, retrying from nearest existing ancestor"
                );
                src_override = Some(fallback);
                fell_back_this_attempt = true;
                continue;
            }
        }

        attempt += 1;
        fell_back_this_attempt = false;
        if attempt >= retry.attempts {
            warn!(
                path = %entry.path.display(),
                attempts = attempt,
                exit_code = result.exit_code,
                "sync failed after exhausting retries"
            );
            return SyncResult {
                ok: false,
                invocations,
                output: result.output,
            };
        }

        debug!(
            path = %entry.path.display(),
            attempt,
            exit_code = result.exit_code,
            "sync attempt failed, retrying"
        );
        tokio::select! {
            _ = token.cancelled() => {
                return SyncResult {
                    ok: false,
                    invocations,
                    output: result.output,
                };
            }
            _ = tokio::time::sleep(retry.interval) => {}
        }
    }
}

/// The ancestor to retry from, if it differs from the current source.
fn vanished_fallback(output: &str, current_src: &Path) -> Option<PathBuf> {
    let vanished =
        parse_vanished_path(output).unwrap_or_else(|| current_src.to_path_buf());
    let ancestor = nearest_existing_parent(&vanished);
    (ancestor != current_src).then_some(ancestor)
}

/// Extract the path from the tool's `file has vanished: "<path>"` line.
fn parse_vanished_path(output: &str) -> Option<PathBuf> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)] // the literal pattern is valid
        Regex::new(r#"file has vanished: "([^"]+)""#).unwrap()
    });
    re.captures(output)
        .map(|caps| PathBuf::from(&caps[1]))
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
