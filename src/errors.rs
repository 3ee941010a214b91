// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ProcessError`] is what every failed spawn, execute or kill resolves
//!   to. It always carries the command that failed and the underlying cause.
//! - [`ProcsupError`] covers the glue around the supervisor (config files,
//!   CLI parsing, IO).

use std::fmt;
use std::io;

use thiserror::Error;

/// Symbolic kind of a [`ProcessError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The command could not be launched, or it ran and failed.
    CommandFailed,
    /// Stopping a process failed.
    KillFailed,
}

impl ErrorCode {
    /// Human label used as the error message.
    pub fn label(self) -> &'static str {
        match self {
            ErrorCode::CommandFailed => "command failed",
            ErrorCode::KillFailed => "failed to stop process",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Root cause wrapped by a [`ProcessError`].
#[derive(Error, Debug)]
pub enum Cause {
    #[error("could not launch process: {0}")]
    Launch(#[source] io::Error),

    /// `stderr` holds the tail of what the process wrote to stderr, when it
    /// was captured.
    #[error("{}", describe_exit(.code, .stderr))]
    Exit {
        code: Option<i32>,
        stderr: Option<String>,
    },

    #[error("i/o error while supervising process: {0}")]
    Io(#[source] io::Error),

    #[error("could not signal process: {0}")]
    Signal(#[source] io::Error),

    #[error("supervisor went away before the process finished")]
    Abandoned,

    #[error(transparent)]
    Nested(Box<ProcessError>),
}

/// Lines of stderr kept on a failed exit.
const STDERR_TAIL_LINES: usize = 20;

fn describe_exit(code: &Option<i32>, stderr: &Option<String>) -> String {
    let status = match code {
        Some(code) => format!("process exited with code {code}"),
        None => "process was terminated by a signal".to_string(),
    };
    match stderr {
        Some(stderr) => format!("{status}\n{stderr}"),
        None => status,
    }
}

fn stderr_tail(stderr: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    let tail = lines[start..].join("\n");
    (!tail.trim().is_empty()).then_some(tail)
}

/// Structured error for a failed process operation.
///
/// Created once by the outcome resolver (or the termination strategy).
#[derive(Error, Debug)]
#[error("{message}: `{subject}`: {cause}")]
pub struct ProcessError {
    code: ErrorCode,
    message: String,
    subject: String,
    #[source]
    cause: Cause,
}

impl ProcessError {
    /// Wrap `cause` into a structured error about `subject`.
    pub fn wrap(cause: Cause, code: ErrorCode, subject: impl Into<String>) -> Self {
        Self {
            code,
            message: code.label().to_string(),
            subject: subject.into(),
            cause,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The command (program plus arguments, or the literal command line)
    /// that failed.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Attach the tail of captured `stderr` to an exit failure. Other causes
    /// are left as they are.
    pub(crate) fn with_stderr(mut self, stderr: &[u8]) -> Self {
        if let Cause::Exit { stderr: slot, .. } = &mut self.cause {
            *slot = stderr_tail(stderr);
        }
        self
    }

    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// Exit code of the process, if it ran and exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match &self.cause {
            Cause::Exit { code, .. } => *code,
            Cause::Nested(inner) => inner.exit_code(),
            _ => None,
        }
    }

    /// True when the executable could not be started at all.
    pub fn is_launch_failure(&self) -> bool {
        match &self.cause {
            Cause::Launch(_) => true,
            Cause::Nested(inner) => inner.is_launch_failure(),
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ProcsupError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ProcsupError>;
