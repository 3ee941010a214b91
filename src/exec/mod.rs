// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running commands, using
//! `tokio::process::Command` behind the [`ProcessBackend`] seam, and turning
//! each run into a [`SpawnHandle`].
//!
//! - [`invocation`] describes what to run (program, args, cwd, env).
//! - [`backend`] provides the `ProcessBackend` trait and the production
//!   `TokioBackend`, which tests can replace with a scripted implementation.
//! - [`relay`] decides what happens to each output chunk.
//! - [`heartbeat`] rate-limits progress markers.
//! - [`outcome`] is the single-resolution result future.
//! - [`spawn`] wires the above together for one process.
//! - [`termination`] picks how to stop a process per platform.

pub mod backend;
pub mod heartbeat;
pub mod invocation;
pub mod outcome;
pub mod relay;
pub mod spawn;
pub mod termination;

pub use backend::{ExitInfo, LaunchedProcess, ProcessBackend, TokioBackend};
pub use heartbeat::{DEFAULT_HEARTBEAT_INTERVAL, Heartbeat, PROGRESS_MARKER};
pub use invocation::{CommandInvocation, EnvOverrides, SpawnOptions};
pub use outcome::Outcome;
pub use relay::{OutputChunk, RelayMode, StreamRelay};
pub use spawn::{OutputStream, ProcessRef, SpawnHandle};
pub use termination::Termination;
