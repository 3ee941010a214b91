// tests/outcome_errors.rs

use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use procsup::exec::SpawnOptions;
use procsup::{Cause, ErrorCode, Platform, Supervisor, Verbosity};
use procsup_test_utils::{RecordingLogger, Script, ScriptedBackend, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn supervisor(
    backend: &ScriptedBackend,
    logger: &RecordingLogger,
    platform: Platform,
) -> Supervisor<ScriptedBackend> {
    Supervisor::builder()
        .logger(Arc::new(logger.clone()))
        .platform(platform)
        .working_dir("/work")
        .env("SHARED", "base")
        .env("OVERRIDDEN", "base")
        .build_with_backend(backend.clone())
}

#[tokio::test]
async fn nonzero_exit_rejects_with_subject_and_code() -> TestResult {
    init_tracing();

    let backend = ScriptedBackend::new().with_script("cargo", Script::exits(101));
    let logger = RecordingLogger::new();
    let sup = supervisor(&backend, &logger, Platform::Unix);

    let err = with_timeout(sup.spawn_with_progress(
        "cargo",
        ["build", "--release"],
        SpawnOptions::new().verbosity(Verbosity::Progress),
    ))
    .await
    .expect_err("exit 101 must fail");

    assert_eq!(err.code(), ErrorCode::CommandFailed);
    assert_eq!(err.message(), "command failed");
    assert_eq!(err.subject(), "cargo build --release");
    assert_eq!(err.exit_code(), Some(101));
    assert!(matches!(err.cause(), Cause::Exit { code: Some(101), .. }));
    assert!(err.to_string().contains("cargo build --release"));

    // No trailing newline on failure.
    assert!(logger.entries().is_empty());
    Ok(())
}

#[tokio::test]
async fn launch_failure_rejects_without_a_process() -> TestResult {
    init_tracing();

    let backend =
        ScriptedBackend::new().with_script("nonexistent-binary-xyz", Script::not_found());
    let logger = RecordingLogger::new();
    let sup = supervisor(&backend, &logger, Platform::Unix);

    let handle = sup.spawn("nonexistent-binary-xyz", ["--flag"], SpawnOptions::new());
    assert_eq!(handle.pid(), None);
    assert!(!handle.process().is_live());

    let err = with_timeout(handle.wait()).await.expect_err("launch must fail");
    assert!(err.is_launch_failure());
    assert_eq!(err.code(), ErrorCode::CommandFailed);
    assert_eq!(err.subject(), "nonexistent-binary-xyz --flag");
    assert!(err.source().is_some(), "original launch error is kept");
    Ok(())
}

#[tokio::test]
async fn spawn_merges_env_and_resolves_working_dir() -> TestResult {
    init_tracing();

    let backend = ScriptedBackend::new();
    let logger = RecordingLogger::new();
    let sup = supervisor(&backend, &logger, Platform::Unix);

    with_timeout(
        sup.spawn(
            "tool",
            ["a b", "c"],
            SpawnOptions::new()
                .env("OVERRIDDEN", "call")
                .env("EXTRA", "1")
                .env_remove("HOME"),
        )
        .wait(),
    )
    .await?;

    with_timeout(
        sup.spawn("tool", Vec::<String>::new(), SpawnOptions::new().cwd("/elsewhere"))
            .wait(),
    )
    .await?;

    let launches = backend.launches();
    assert_eq!(launches.len(), 2);

    let first = &launches[0];
    assert_eq!(first.program(), "tool");
    assert_eq!(first.args(), ["a b".to_string(), "c".to_string()]);
    assert_eq!(first.working_dir(), Path::new("/work"));

    let expected: BTreeMap<String, Option<String>> = [
        ("EXTRA", Some("1")),
        ("HOME", None),
        ("OVERRIDDEN", Some("call")),
        ("SHARED", Some("base")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
    .collect();
    assert_eq!(first.env(), &expected);

    assert_eq!(launches[1].working_dir(), Path::new("/elsewhere"));
    Ok(())
}

#[tokio::test]
async fn execute_runs_through_shell_and_logs_output_once() -> TestResult {
    init_tracing();

    let backend = ScriptedBackend::new()
        .with_script("sh", Script::succeeds().stdout("line 1\n").stdout("line 2\n"));
    let logger = RecordingLogger::new();
    let sup = supervisor(&backend, &logger, Platform::Unix);

    with_timeout(sup.execute("make all && make test")).await?;

    let launches = backend.launches();
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].program(), "sh");
    assert_eq!(
        launches[0].args(),
        ["-c".to_string(), "make all && make test".to_string()]
    );

    assert_eq!(logger.info_lines(), vec!["line 1\nline 2".to_string()]);
    assert_eq!(
        logger.debug_lines(),
        vec![
            "running `make all && make test`".to_string(),
            "finished `make all && make test`".to_string(),
        ]
    );
    assert!(logger.stream_chunks(procsup::StreamSink::Stdout).is_empty());
    Ok(())
}

#[tokio::test]
async fn execute_failure_reports_literal_command_line() -> TestResult {
    init_tracing();

    let backend = ScriptedBackend::new().with_script("cmd", Script::exits(1));
    let logger = RecordingLogger::new();
    let sup = supervisor(&backend, &logger, Platform::Windows);

    let err = with_timeout(sup.execute("dir C:\\missing"))
        .await
        .expect_err("exit 1 must fail");

    assert_eq!(err.subject(), "dir C:\\missing");
    assert_eq!(err.exit_code(), Some(1));
    assert_eq!(backend.launches()[0].args()[0], "/C");
    assert!(logger.info_lines().is_empty());
    Ok(())
}

#[tokio::test]
async fn execute_captured_returns_stdout() -> TestResult {
    init_tracing();

    let backend = ScriptedBackend::new()
        .with_script("sh", Script::succeeds().stdout("v1.2.3\n").stderr("ignored\n"));
    let logger = RecordingLogger::new();
    let sup = supervisor(&backend, &logger, Platform::Unix);

    let out = with_timeout(sup.execute_captured("tool --version")).await?;
    assert_eq!(out, "v1.2.3\n");
    Ok(())
}

#[tokio::test]
async fn execute_failure_carries_stderr_tail() -> TestResult {
    init_tracing();

    let backend = ScriptedBackend::new().with_script(
        "sh",
        Script::exits(2)
            .stdout("partial\n")
            .stderr("make: *** No rule to make target 'al'.\n")
            .stderr("make: stop.\n"),
    );
    let logger = RecordingLogger::new();
    let sup = supervisor(&backend, &logger, Platform::Unix);

    let err = with_timeout(sup.execute("make al"))
        .await
        .expect_err("exit 2 must fail");

    match err.cause() {
        Cause::Exit { code, stderr } => {
            assert_eq!(*code, Some(2));
            assert_eq!(
                stderr.as_deref(),
                Some("make: *** No rule to make target 'al'.\nmake: stop.")
            );
        }
        other => panic!("expected exit failure, got {other:?}"),
    }
    assert!(err.to_string().contains("No rule to make target"));
    Ok(())
}

#[tokio::test]
async fn spawn_failure_has_no_stderr_attached() -> TestResult {
    init_tracing();

    let backend = ScriptedBackend::new().with_script("tool", Script::exits(3).stderr("oops\n"));
    let logger = RecordingLogger::new();
    let sup = supervisor(&backend, &logger, Platform::Unix);

    let err = with_timeout(sup.spawn("tool", Vec::<String>::new(), SpawnOptions::new()).wait())
        .await
        .expect_err("exit 3 must fail");

    assert!(matches!(err.cause(), Cause::Exit { code: Some(3), stderr: None }));
    Ok(())
}
