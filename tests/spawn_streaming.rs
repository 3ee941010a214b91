// tests/spawn_streaming.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use procsup::exec::SpawnOptions;
use procsup::{Platform, StreamSink, Supervisor, Verbosity};
use procsup_test_utils::{
    LogEntry, RecordingLogger, Script, ScriptedBackend, init_tracing, with_timeout,
};

type TestResult = Result<(), Box<dyn Error>>;

fn supervisor(backend: &ScriptedBackend, logger: &RecordingLogger) -> Supervisor<ScriptedBackend> {
    Supervisor::builder()
        .logger(Arc::new(logger.clone()))
        .platform(Platform::Unix)
        .working_dir("/work")
        .build_with_backend(backend.clone())
}

#[tokio::test]
async fn output_mode_forwards_every_chunk_per_stream_in_order() -> TestResult {
    init_tracing();

    let backend = ScriptedBackend::new().with_script(
        "build",
        Script::succeeds()
            .stdout("compiling a\n")
            .stderr("warning: x\n")
            .stdout("compiling b\n")
            .stderr("warning: y\n")
            .stdout("done\n"),
    );
    let logger = RecordingLogger::new();
    let sup = supervisor(&backend, &logger);

    let handle = sup.spawn_child_process("build", ["--release"], SpawnOptions::new());
    with_timeout(handle.wait()).await?;

    assert_eq!(
        logger.stream_text(StreamSink::Stdout),
        "compiling a\ncompiling b\ndone\n"
    );
    assert_eq!(
        logger.stream_text(StreamSink::Stderr),
        "warning: x\nwarning: y\n"
    );

    let debug = logger.debug_lines();
    assert_eq!(debug.first().map(String::as_str), Some("spawning `build --release`"));
    assert_eq!(debug.last().map(String::as_str), Some("finished `build --release`"));
    Ok(())
}

#[tokio::test]
async fn output_verbosity_appends_trailing_newline_after_stream() -> TestResult {
    init_tracing();

    let backend = ScriptedBackend::new().with_script("echo", Script::succeeds().stdout("hello\n"));
    let logger = RecordingLogger::new();
    let sup = supervisor(&backend, &logger);

    with_timeout(sup.spawn_with_progress(
        "echo",
        ["hello"],
        SpawnOptions::new().verbosity(Verbosity::Output),
    ))
    .await?;

    assert_eq!(logger.stream_text(StreamSink::Stdout), "hello\n\n");
    assert_eq!(
        logger.entries().last(),
        Some(&LogEntry::Stream(StreamSink::Stdout, b"\n".to_vec()))
    );
    Ok(())
}

#[tokio::test]
async fn failed_streaming_spawn_does_not_log_end_line() -> TestResult {
    init_tracing();

    let backend = ScriptedBackend::new().with_script("build", Script::exits(2).stderr("boom\n"));
    let logger = RecordingLogger::new();
    let sup = supervisor(&backend, &logger);

    let handle = sup.spawn_child_process("build", Vec::<String>::new(), SpawnOptions::new());
    let err = with_timeout(handle.wait())
        .await
        .expect_err("exit 2 must fail");

    assert_eq!(err.exit_code(), Some(2));
    assert_eq!(logger.stream_text(StreamSink::Stderr), "boom\n");
    assert_eq!(logger.debug_lines(), vec!["spawning `build`".to_string()]);
    Ok(())
}

#[tokio::test]
async fn silent_mode_shows_only_the_final_newline() -> TestResult {
    init_tracing();

    let backend = ScriptedBackend::new().with_script(
        "noisy",
        Script::succeeds().stdout("lots\n").stderr("of\n").stdout("output\n"),
    );
    let logger = RecordingLogger::new();
    let sup = supervisor(&backend, &logger);

    let run = sup.spawn_with_progress("noisy", Vec::<String>::new(), SpawnOptions::new());
    with_timeout(run).await?;

    assert_eq!(
        logger.entries(),
        vec![LogEntry::Stream(StreamSink::Stdout, b"\n".to_vec())]
    );
    Ok(())
}

#[tokio::test]
async fn progress_mode_emits_one_marker_for_a_burst() -> TestResult {
    init_tracing();

    let backend = ScriptedBackend::new().with_script(
        "burst",
        Script::succeeds()
            .stdout("1\n")
            .stderr("2\n")
            .stdout("3\n")
            .stdout("4\n")
            .stderr("5\n"),
    );
    let logger = RecordingLogger::new();
    let sup = Supervisor::builder()
        .logger(Arc::new(logger.clone()))
        .heartbeat_interval(Duration::from_secs(60))
        .build_with_backend(backend);

    with_timeout(sup.spawn_with_progress(
        "burst",
        Vec::<String>::new(),
        SpawnOptions::new().verbosity(Verbosity::Progress),
    ))
    .await?;

    assert_eq!(logger.stream_text(StreamSink::Stdout), ".\n");
    assert!(logger.stream_chunks(StreamSink::Stderr).is_empty());
    assert!(logger.debug_lines().is_empty(), "no start/end lines in progress mode");
    Ok(())
}

#[tokio::test]
async fn progress_mode_emits_a_marker_per_spaced_chunk() -> TestResult {
    init_tracing();

    let backend = ScriptedBackend::new().with_script(
        "slow",
        Script::succeeds()
            .stdout("a")
            .sleep_ms(150)
            .stderr("b")
            .sleep_ms(150)
            .stdout("c"),
    );
    let logger = RecordingLogger::new();
    let sup = Supervisor::builder()
        .logger(Arc::new(logger.clone()))
        .heartbeat_interval(Duration::from_millis(20))
        .build_with_backend(backend);

    with_timeout(sup.spawn_with_progress(
        "slow",
        Vec::<String>::new(),
        SpawnOptions::new().verbosity(Verbosity::Progress),
    ))
    .await?;

    assert_eq!(logger.stream_text(StreamSink::Stdout), "...\n");
    Ok(())
}

#[tokio::test]
async fn live_output_stream_sees_chunks_alongside_the_logger() -> TestResult {
    init_tracing();

    let backend = ScriptedBackend::new().with_script(
        "gen",
        Script::succeeds().stdout("one ").stdout("two ").stderr("err").stdout("three"),
    );
    let logger = RecordingLogger::new();
    let sup = supervisor(&backend, &logger);

    let handle = sup.spawn(
        "gen",
        Vec::<String>::new(),
        SpawnOptions::new().capture_output(),
    );
    let (_process, output, outcome) = handle.into_parts();

    let (stdout, result) = with_timeout(async {
        tokio::join!(output.collect(StreamSink::Stdout), outcome)
    })
    .await;

    result?;
    assert_eq!(String::from_utf8(stdout)?, "one two three");
    // Silent by default: nothing reached the logger.
    assert!(logger.entries().is_empty());
    Ok(())
}
