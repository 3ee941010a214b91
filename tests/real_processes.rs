// tests/real_processes.rs
//
// Runs actual OS processes through the tokio backend.

#![cfg(unix)]

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use procsup::exec::SpawnOptions;
use procsup::{Cause, StreamSink, Supervisor, Verbosity};
use procsup_test_utils::{RecordingLogger, init_tracing, with_timeout};
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn Error>>;

fn supervisor(logger: &RecordingLogger) -> Supervisor {
    Supervisor::builder()
        .logger(Arc::new(logger.clone()))
        .build()
}

#[tokio::test]
async fn echo_hello_streams_and_appends_newline() -> TestResult {
    init_tracing();
    let logger = RecordingLogger::new();
    let sup = supervisor(&logger);

    with_timeout(sup.spawn_with_progress(
        "echo",
        ["hello"],
        SpawnOptions::new().verbosity(Verbosity::Output),
    ))
    .await?;

    assert_eq!(logger.stream_text(StreamSink::Stdout), "hello\n\n");
    Ok(())
}

#[tokio::test]
async fn missing_binary_is_a_launch_failure() -> TestResult {
    init_tracing();
    let logger = RecordingLogger::new();
    let sup = supervisor(&logger);

    let err = with_timeout(sup.spawn_with_progress(
        "nonexistent-binary-xyz",
        Vec::<String>::new(),
        SpawnOptions::new(),
    ))
    .await
    .expect_err("binary does not exist");

    assert!(err.is_launch_failure());
    assert!(err.subject().contains("nonexistent-binary-xyz"));
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_code_is_reported() -> TestResult {
    init_tracing();
    let logger = RecordingLogger::new();
    let sup = supervisor(&logger);

    let err = with_timeout(sup.spawn("sh", ["-c", "exit 3"], SpawnOptions::new()).wait())
        .await
        .expect_err("exit 3 must fail");

    assert_eq!(err.exit_code(), Some(3));
    assert_eq!(err.subject(), "sh -c exit 3");
    Ok(())
}

#[tokio::test]
async fn working_dir_and_env_reach_the_child() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let logger = RecordingLogger::new();
    let sup = supervisor(&logger);

    let handle = sup.spawn(
        "sh",
        ["-c", "pwd; printf '%s' \"$PROCSUP_TEST_VAR\"; test -n \"$PATH\""],
        SpawnOptions::new()
            .cwd(dir.path())
            .env("PROCSUP_TEST_VAR", "from-override")
            .capture_output(),
    );
    let (_, output, outcome) = handle.into_parts();
    let (stdout, result) =
        with_timeout(async { tokio::join!(output.collect(StreamSink::Stdout), outcome) }).await;
    result?;

    let stdout = String::from_utf8(stdout)?;
    let mut lines = stdout.lines();
    let pwd = lines.next().unwrap_or_default();
    assert_eq!(
        std::fs::canonicalize(pwd)?,
        std::fs::canonicalize(dir.path())?
    );
    // PATH is still inherited alongside the override.
    assert_eq!(lines.next(), Some("from-override"));
    Ok(())
}

#[tokio::test]
async fn execute_logs_captured_output() -> TestResult {
    init_tracing();
    let logger = RecordingLogger::new();
    let sup = supervisor(&logger);

    with_timeout(sup.execute("echo captured; echo to-stderr 1>&2")).await?;

    assert_eq!(logger.info_lines(), vec!["captured".to_string()]);
    assert!(logger.stream_chunks(StreamSink::Stdout).is_empty());
    Ok(())
}

#[tokio::test]
async fn kill_terminates_a_sleeping_process() -> TestResult {
    init_tracing();
    let logger = RecordingLogger::new();
    let sup = supervisor(&logger);

    let handle = sup.spawn("sleep", ["30"], SpawnOptions::new());
    let (process, _output, outcome) = handle.into_parts();
    let pid = process.pid().expect("sleep has a pid");

    tokio::time::sleep(Duration::from_millis(50)).await;
    with_timeout(sup.kill(Some(&process))).await?;

    let err = with_timeout(outcome).await.expect_err("terminated process fails");
    assert!(matches!(err.cause(), Cause::Exit { code: None, .. }));
    assert_eq!(logger.info_lines(), vec![format!("process {pid} stopped")]);
    Ok(())
}
