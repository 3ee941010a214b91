// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The supervisor talks to a `ProcessBackend` instead of calling
//! `tokio::process::Command` directly. This makes it easy to swap in a
//! scripted backend in tests while keeping the production implementation in
//! [`TokioBackend`].
//!
//! - `launch` starts one OS process and hands back its pipes plus a future
//!   that resolves when it exits.
//! - `signal` delivers a termination signal to a pid. It is only used on
//!   Unix-like platforms; Windows goes through `taskkill` instead.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::AsyncRead;
use tokio::process::Command;
use tracing::debug;

use super::invocation::CommandInvocation;

pub type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;
pub type ExitFuture = Pin<Box<dyn Future<Output = io::Result<ExitInfo>> + Send>>;

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// Exit code, or `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ExitInfo {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitInfo {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// A process that has been started by a backend.
pub struct LaunchedProcess {
    pub pid: Option<u32>,
    pub stdout: Option<BoxedReader>,
    pub stderr: Option<BoxedReader>,
    /// Resolves once the process has exited (and has been reaped).
    pub exit: ExitFuture,
}

/// Trait abstracting how processes are started and signalled.
///
/// Production code uses [`TokioBackend`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ProcessBackend: Send + Sync {
    /// Start exactly one process for `invocation`.
    ///
    /// Must be called from within a Tokio runtime.
    fn launch(&self, invocation: &CommandInvocation) -> io::Result<LaunchedProcess>;

    /// Ask the process `pid` to terminate.
    ///
    /// Returns an error of kind [`io::ErrorKind::NotFound`] when no such
    /// process exists.
    fn signal(&self, pid: u32) -> io::Result<()>;
}

/// Real backend built on `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioBackend;

impl ProcessBackend for TokioBackend {
    fn launch(&self, invocation: &CommandInvocation) -> io::Result<LaunchedProcess> {
        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.args())
            .current_dir(invocation.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (key, value) in invocation.env() {
            match value {
                Some(value) => cmd.env(key, value),
                None => cmd.env_remove(key),
            };
        }

        let mut child = cmd.spawn()?;
        let pid = child.id();
        debug!(program = %invocation.program(), ?pid, "spawned child process");

        let stdout = child.stdout.take().map(|s| Box::pin(s) as BoxedReader);
        let stderr = child.stderr.take().map(|s| Box::pin(s) as BoxedReader);
        let exit: ExitFuture = Box::pin(async move { child.wait().await.map(ExitInfo::from) });

        Ok(LaunchedProcess {
            pid,
            stdout,
            stderr,
            exit,
        })
    }

    fn signal(&self, pid: u32) -> io::Result<()> {
        send_sigterm(pid)
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("pid {pid} out of range"))
    })?;

    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no process with pid {pid}"),
        )),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

#[cfg(not(unix))]
fn send_sigterm(pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot signal process {pid} directly on this platform"),
    ))
}
