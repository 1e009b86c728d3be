// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn captures_stdout_and_exit_code() {
    let out = ShellTransferRunner.execute("echo hello").await;
    assert_eq!(out.exit_code, 0);
    assert!(out.success());
    assert_eq!(out.output.trim(), "hello");
}

#[tokio::test]
async fn combines_stdout_and_stderr_in_write_order() {
    let out = ShellTransferRunner
        .execute("echo one; echo two 1>&2; echo three")
        .await;
    assert_eq!(out.exit_code, 0);
    assert_eq!(out.output, "one\ntwo\nthree\n");
}

#[tokio::test]
async fn reports_nonzero_exit_codes() {
    let out = ShellTransferRunner.execute("echo boom 1>&2; exit 24").await;
    assert_eq!(out.exit_code, 24);
    assert!(!out.success());
    assert_eq!(out.output.trim(), "boom");
}

#[tokio::test]
async fn handles_large_output_beyond_pipe_capacity() {
    // Well past the default 64 KiB pipe buffer.
    let out = ShellTransferRunner
        .execute("i=0; while [ $i -lt 20000 ]; do echo 0123456789; i=$((i+1)); done")
        .await;
    assert_eq!(out.exit_code, 0);
    assert_eq!(out.output.len(), 20000 * 11);
}

#[tokio::test]
async fn empty_output_is_empty_string() {
    let out = ShellTransferRunner.execute("true").await;
    assert_eq!(out.exit_code, 0);
    assert_eq!(out.output, "");
}

#[tokio::test]
async fn fake_runner_replays_scripted_results() {
    let fake = FakeTransferRunner::new();
    fake.push_result(24, "file has vanished: \"/tmp/x\"");
    fake.push_result(0, "");

    let first = fake.execute("cmd-one").await;
    assert_eq!(first.exit_code, 24);
    let second = fake.execute("cmd-two").await;
    assert!(second.success());
    // Unscripted calls succeed by default.
    let third = fake.execute("cmd-three").await;
    assert!(third.success());

    assert_eq!(fake.commands(), vec!["cmd-one", "cmd-two", "cmd-three"]);
}

#[tokio::test]
async fn fake_runner_handler_sees_command() {
    let fake = FakeTransferRunner::with_handler(|cmd| CommandOutput {
        exit_code: i32::from(!cmd.contains("ok")),
        output: String::new(),
    });
    assert!(fake.execute("this is ok").await.success());
    assert!(!fake.execute("this is not").await.success());
}
