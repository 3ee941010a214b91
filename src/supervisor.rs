// src/supervisor.rs

//! Public command facade.
//!
//! [`Supervisor`] composes the exec layer into the four operations callers
//! use:
//! - [`Supervisor::execute`]: run a full command line, log its output once.
//! - [`Supervisor::spawn_child_process`]: spawn with live output streaming.
//! - [`Supervisor::spawn_with_progress`]: spawn and wait, showing output,
//!   a heartbeat, or nothing.
//! - [`Supervisor::kill`]: stop a process the platform-appropriate way.
//!
//! There is no built-in timeout. Race the [`Outcome`](crate::exec::Outcome)
//! against a timer and call `kill` if you need one.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::errors::{Cause, ErrorCode, ProcessError};
use crate::exec::invocation::{CommandInvocation, EnvOverrides, SpawnOptions};
use crate::exec::relay::{RelayMode, StreamRelay};
use crate::exec::spawn::{ProcessRef, SpawnHandle, spawn_supervised};
use crate::exec::{DEFAULT_HEARTBEAT_INTERVAL, ProcessBackend, Termination, TokioBackend};
use crate::logger::{Logger, NullLogger, StreamSink};
use crate::platform::Platform;
use crate::types::Verbosity;

/// Process supervisor with an injected logger, platform and backend.
pub struct Supervisor<B: ProcessBackend = TokioBackend> {
    backend: Arc<B>,
    logger: Arc<dyn Logger>,
    platform: Platform,
    working_dir: PathBuf,
    env: EnvOverrides,
    heartbeat_interval: Duration,
}

/// Builder for [`Supervisor`].
///
/// Defaults: [`NullLogger`], [`Platform::current`], the process's current
/// directory, no env overrides, a 1500 ms heartbeat.
pub struct SupervisorBuilder {
    logger: Arc<dyn Logger>,
    platform: Platform,
    working_dir: Option<PathBuf>,
    env: EnvOverrides,
    heartbeat_interval: Duration,
}

impl SupervisorBuilder {
    pub fn new() -> Self {
        Self {
            logger: Arc::new(NullLogger),
            platform: Platform::current(),
            working_dir: None,
            env: EnvOverrides::new(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set a variable for every process this supervisor starts.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), Some(value.into()));
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn build(self) -> Supervisor<TokioBackend> {
        self.build_with_backend(TokioBackend)
    }

    pub fn build_with_backend<B: ProcessBackend>(self, backend: B) -> Supervisor<B> {
        let working_dir = self
            .working_dir
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        Supervisor {
            backend: Arc::new(backend),
            logger: self.logger,
            platform: self.platform,
            working_dir,
            env: self.env,
            heartbeat_interval: self.heartbeat_interval,
        }
    }
}

impl Default for SupervisorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor<TokioBackend> {
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }
}

impl<B: ProcessBackend> Supervisor<B> {
    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn invocation<I>(&self, program: &str, args: I, options: SpawnOptions) -> CommandInvocation
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        CommandInvocation::resolve(program, args, &self.working_dir, &self.env, options)
    }

    fn relay(&self, mode: RelayMode) -> StreamRelay {
        StreamRelay::new(mode, Arc::clone(&self.logger))
    }

    /// Start `program` with `args` and return immediately.
    ///
    /// Arguments are passed verbatim; no shell is involved. Output is relayed
    /// according to `options.verbosity`. Must be called from within a Tokio
    /// runtime.
    pub fn spawn<I>(&self, program: &str, args: I, options: SpawnOptions) -> SpawnHandle
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let invocation = self.invocation(program, args, options);
        let mode = RelayMode::for_verbosity(invocation.verbosity(), self.heartbeat_interval);
        spawn_supervised(&*self.backend, &invocation, self.relay(mode), None)
    }

    /// Spawn with every stdout/stderr chunk streamed to the logger as it
    /// arrives, bracketed by start/end debug lines.
    ///
    /// The end line is only logged on success; a failure surfaces through the
    /// outcome alone.
    pub fn spawn_child_process<I>(
        &self,
        program: &str,
        args: I,
        options: SpawnOptions,
    ) -> SpawnHandle
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let invocation = self
            .invocation(program, args, options)
            .with_verbosity(Verbosity::Output);
        let subject = invocation.subject();

        self.logger.debug(&format!("spawning `{subject}`"));
        spawn_supervised(
            &*self.backend,
            &invocation,
            self.relay(RelayMode::Passthrough),
            Some(format!("finished `{subject}`")),
        )
    }

    /// Spawn and wait, showing output according to `options.verbosity`.
    ///
    /// A single newline is written to the stdout sink on success, closing
    /// off any streamed output or progress markers.
    pub async fn spawn_with_progress<I>(
        &self,
        program: &str,
        args: I,
        options: SpawnOptions,
    ) -> Result<(), ProcessError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let verbosity = options.verbosity;
        let handle = match verbosity {
            Verbosity::Output => self.spawn_child_process(program, args, options),
            Verbosity::Progress | Verbosity::Silent => self.spawn(program, args, options),
        };

        handle.wait().await?;
        self.logger.log_stream(b"\n", StreamSink::Stdout);
        Ok(())
    }

    /// Run `command_line` through the platform shell and return its stdout.
    ///
    /// Output is buffered, not streamed; it is logged at info level once the
    /// process has ended. Failures are reported against the literal command
    /// line and carry the tail of its stderr.
    pub async fn execute_captured(&self, command_line: &str) -> Result<String, ProcessError> {
        let (shell, flag) = self.platform.shell();
        let invocation =
            CommandInvocation::new(shell, [flag, command_line], self.working_dir.clone())
                .with_env(self.env.clone())
                .with_captured_output(true)
                .with_subject(command_line);

        self.logger.debug(&format!("running `{command_line}`"));
        let handle = spawn_supervised(
            &*self.backend,
            &invocation,
            self.relay(RelayMode::Discard),
            None,
        );

        let (_, output, outcome) = handle.into_parts();
        let ((stdout, stderr), result) = tokio::join!(output.collect_split(), outcome);
        result.map_err(|e| e.with_stderr(&stderr))?;

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let shown = stdout.trim_end();
        if !shown.is_empty() {
            self.logger.info(shown);
        }
        self.logger.debug(&format!("finished `{command_line}`"));

        Ok(stdout)
    }

    /// Run `command_line` through the platform shell and wait for it.
    pub async fn execute(&self, command_line: &str) -> Result<(), ProcessError> {
        self.execute_captured(command_line).await.map(|_| ())
    }

    /// Stop `process`.
    ///
    /// Asking to stop something that is not running (no handle, never
    /// started, or already exited) only logs a warning.
    pub async fn kill(&self, process: Option<&ProcessRef>) -> Result<(), ProcessError> {
        let pid = match process {
            Some(process) if process.is_live() => process.pid(),
            _ => None,
        };
        let Some(pid) = pid else {
            self.logger.warning("process not found; nothing to stop");
            return Ok(());
        };

        let strategy = Termination::for_platform(self.platform);
        debug!(pid, ?strategy, "stopping process");

        match strategy {
            Termination::TaskTree => {
                let command = Termination::task_tree_command(pid);
                self.execute(&command).await.map_err(|e| {
                    ProcessError::wrap(
                        Cause::Nested(Box::new(e)),
                        ErrorCode::KillFailed,
                        format!("process {pid}"),
                    )
                })?;
            }
            Termination::Signal => match self.backend.signal(pid) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    self.logger
                        .warning(&format!("process {pid} not found; it may have already exited"));
                    return Ok(());
                }
                Err(e) => {
                    return Err(ProcessError::wrap(
                        Cause::Signal(e),
                        ErrorCode::KillFailed,
                        format!("process {pid}"),
                    ));
                }
            },
        }

        self.logger.info(&format!("process {pid} stopped"));
        Ok(())
    }
}
