// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod control_flow;
mod full_sync;
mod immediate;
mod periodic;

use super::*;
use crate::control::ControlState;
use pairsync_adapters::{
    ErrorReporter, FakeRoleProvider, FakeServiceManager, FakeTransferRunner,
};
use pairsync_core::{RetryPolicy, Role, SyncDirection};
use std::time::Duration;
use tempfile::TempDir;

pub(super) type TestEngine = Engine<FakeTransferRunner, FakeServiceManager, FakeRoleProvider>;

pub(super) struct Harness {
    pub engine: Arc<TestEngine>,
    pub roles: Arc<FakeRoleProvider>,
    pub services: Arc<FakeServiceManager>,
    pub token: CancellationToken,
    pub dir: TempDir,
}

impl Harness {
    pub fn runner(&self) -> &FakeTransferRunner {
        &self.engine.transfer
    }

    pub fn outbox(&self) -> PathBuf {
        self.dir.path().join("outbox")
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub(super) fn harness(entries: Vec<SyncEntry>, role: Role) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let roles = Arc::new(FakeRoleProvider::new(role));
    let services = Arc::new(FakeServiceManager::new());
    let control = Arc::new(ControlState::restore(&dir.path().join("control.json")));

    let engine = Arc::new(Engine::new(
        EngineDeps {
            transfer: FakeTransferRunner::new(),
            services: Arc::clone(&services),
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
        services,
        token: CancellationToken::new(),
        dir,
    }
}

pub(super) fn file_entry(path: &Path) -> SyncEntry {
    SyncEntry {
        path: path.to_path_buf(),
        is_dir: false,
        dest_path: None,
        direction: SyncDirection::Active2Passive,
        sync_type: SyncType::Immediate,
        periodicity: None,
        retry: RetryPolicy {
            attempts: 1,
            interval: Duration::from_millis(1),
        },
        exclude: None,
        include: None,
        notify_sibling: None,
    }
}

pub(super) fn dir_entry(path: &Path) -> SyncEntry {
    SyncEntry {
        is_dir: true,
        ..file_entry(path)
    }
}

/// Wait until the fake runner has seen at least `count` invocations.
pub(super) async fn wait_for_invocations(harness: &Harness, count: usize) {
    let deadline = tokio::time::timeout(Duration::from_secs(5), async {
        while harness.runner().invocation_count() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    });
    deadline.await.expect("expected transfer never ran");
}
