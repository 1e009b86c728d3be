// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared scaffolding for the scenario tests.

use pairsync_adapters::{
    CommandOutput, ErrorReporter, FakeRoleProvider, FakeServiceManager, FakeTransferRunner,
};
use pairsync_core::{Role, SyncEntry};
use pairsync_engine::{ControlState, Engine, EngineConfig, EngineDeps};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub type SpecEngine = Engine<FakeTransferRunner, FakeServiceManager, FakeRoleProvider>;

pub struct Harness {
    pub engine: Arc<SpecEngine>,
    pub roles: Arc<FakeRoleProvider>,
    pub token: CancellationToken,
    pub dir: TempDir,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Build an engine over a catalogue directory, with transfers performed
/// as real local copies.
pub fn harness_from_catalog(catalog_dir: &Path, role: Role) -> Harness {
    let entries = pairsync_catalog::load_dir(catalog_dir).entries;
    harness_from_entries(entries, role)
}

pub fn harness_from_entries(entries: Vec<SyncEntry>, role: Role) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let roles = Arc::new(FakeRoleProvider::new(role));
    let control = Arc::new(ControlState::restore(&dir.path().join("control.json")));

    let engine = Arc::new(Engine::new(
        EngineDeps {
            transfer: FakeTransferRunner::with_handler(local_copy_handler),
            services: Arc::new(FakeServiceManager::new()),
            roles: Arc::clone(&roles),
            reporter: ErrorReporter::new(&dir.path().join("reports")),
        },
        EngineConfig {
            notify_outbox: dir.path().join("outbox"),
            notify_inbox: dir.path().join("inbox"),
        },
        control,
        entries,
    ));

    Harness {
        engine,
        roles,
        token: CancellationToken::new(),
        dir,
    }
}

/// Where a source path lands under a destination root.
pub fn mirrored(dest_root: &Path, src: &Path) -> PathBuf {
    dest_root.join(src.strip_prefix("/").unwrap_or(src))
}

/// Wait until `pred` holds, or panic after five seconds.
pub async fn wait_for(pred: impl Fn() -> bool) {
    let deadline = tokio::time::timeout(Duration::from_secs(5), async {
        while !pred() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    });
    deadline.await.expect("condition never became true");
}

/// Perform the transfer described by a generated command as a local copy.
///
/// Commands frame sources and destinations as their last two tokens
/// (the scenario entries carry no filter lists).
pub fn local_copy_handler(cmd: &str) -> CommandOutput {
    let tokens: Vec<&str> = cmd.split_whitespace().collect();
    if tokens.len() < 2 {
        return failed(format!("unparseable command: {cmd}"));
    }
    let src = tokens[tokens.len() - 2];
    let dst = tokens[tokens.len() - 1];

    let result = if src.ends_with('/') {
        copy_tree(Path::new(src.trim_end_matches('/')), Path::new(dst.trim_end_matches('/')))
    } else {
        let src_path = Path::new(src);
        let dst_dir = Path::new(dst.trim_end_matches('/'));
        fs::create_dir_all(dst_dir).and_then(|_| {
            let name = src_path
                .file_name()
                .ok_or_else(|| std::io::Error::other("source has no file name"))?;
            fs::copy(src_path, dst_dir.join(name)).map(|_| ())
        })
    };

    match result {
        Ok(()) => CommandOutput {
            exit_code: 0,
            output: String::new(),
        },
        Err(e) => failed(format!("copy failed: {e}")),
    }
}

fn failed(output: String) -> CommandOutput {
    CommandOutput {
        exit_code: 23,
        output,
    }
}

fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.path().is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Write one catalogue file into `dir`.
pub fn write_catalog(dir: &Path, name: &str, body: &serde_json::Value) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), serde_json::to_string_pretty(body).unwrap()).unwrap();
}
