// src/exec/invocation.rs

//! Describing a single command to run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::types::Verbosity;

/// Environment overrides: `Some(value)` sets a variable, `None` removes it.
///
/// Overrides are applied on top of the inherited environment, never instead
/// of it.
pub type EnvOverrides = BTreeMap<String, Option<String>>;

/// Per-call options for spawning a process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnOptions {
    /// Working directory; the supervisor's own directory when `None`.
    pub working_dir: Option<PathBuf>,
    pub env: EnvOverrides,
    pub verbosity: Verbosity,
    /// Also copy every chunk into the handle's [`OutputStream`].
    ///
    /// [`OutputStream`]: super::spawn::OutputStream
    pub capture_output: bool,
}

impl SpawnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), Some(value.into()));
        self
    }

    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env.insert(key.into(), None);
        self
    }

    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn capture_output(mut self) -> Self {
        self.capture_output = true;
        self
    }
}

/// A fully resolved command, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    env: EnvOverrides,
    verbosity: Verbosity,
    capture_output: bool,
    subject: Option<String>,
}

impl CommandInvocation {
    pub fn new<I>(program: impl Into<String>, args: I, working_dir: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: working_dir.into(),
            env: EnvOverrides::new(),
            verbosity: Verbosity::default(),
            capture_output: false,
            subject: None,
        }
    }

    /// Resolve per-call `options` against supervisor-wide defaults.
    ///
    /// Call-level env entries win over `base_env` entries with the same name.
    pub(crate) fn resolve<I>(
        program: impl Into<String>,
        args: I,
        default_dir: &Path,
        base_env: &EnvOverrides,
        options: SpawnOptions,
    ) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let working_dir = options
            .working_dir
            .unwrap_or_else(|| default_dir.to_path_buf());

        let mut env = base_env.clone();
        env.extend(options.env);

        Self::new(program, args, working_dir)
            .with_env(env)
            .with_verbosity(options.verbosity)
            .with_captured_output(options.capture_output)
    }

    pub fn with_env(mut self, env: EnvOverrides) -> Self {
        self.env = env;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_captured_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// Report failures under `subject` instead of the program + arguments.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn env(&self) -> &EnvOverrides {
        &self.env
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn captures_output(&self) -> bool {
        self.capture_output
    }

    /// Human-readable command used in logs and errors: the explicit subject
    /// if one was set, otherwise program and arguments joined by spaces.
    pub fn subject(&self) -> String {
        if let Some(ref subject) = self.subject {
            return subject.clone();
        }

        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
