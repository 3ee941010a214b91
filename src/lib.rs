// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logger;
pub mod logging;
pub mod platform;
pub mod supervisor;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{info, warn};

use crate::cli::{CliArgs, Command, RunArgs};
use crate::config::load_or_default;
use crate::errors::{ProcsupError, Result};
use crate::exec::{ProcessBackend, SpawnOptions};
use crate::logger::TracingLogger;

pub use crate::errors::{Cause, ErrorCode, ProcessError};
pub use crate::exec::{OutputChunk, Outcome, ProcessRef, SpawnHandle};
pub use crate::logger::{Logger, NullLogger, StreamSink};
pub use crate::platform::Platform;
pub use crate::supervisor::{Supervisor, SupervisorBuilder};
pub use crate::types::Verbosity;

/// High-level entry point used by `main.rs`.
///
/// This wires together config loading, a `Supervisor` logging through
/// `tracing`, and the chosen subcommand.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref())?;
    let supervisor = cfg
        .supervisor_builder()
        .logger(Arc::new(TracingLogger))
        .build();

    match args.command {
        Command::Exec { command_line } => {
            supervisor.execute(&command_line).await?;
        }
        Command::Run(run_args) => {
            run_program(&supervisor, cfg.supervisor.verbosity, run_args).await?;
        }
    }

    Ok(())
}

/// `procsup run`: spawn and wait, optionally racing a timeout.
///
/// `default_verbosity` applies when the arguments don't pick one. On
/// timeout the process is stopped with [`Supervisor::kill`] and the run
/// fails with [`ProcsupError::Other`].
pub async fn run_program<B: ProcessBackend>(
    supervisor: &Supervisor<B>,
    default_verbosity: Verbosity,
    args: RunArgs,
) -> Result<()> {
    let mut options = SpawnOptions::new().verbosity(args.verbosity.unwrap_or(default_verbosity));
    if let Some(dir) = args.cwd {
        options = options.cwd(dir);
    }
    for (key, value) in args.env {
        options = options.env(key, value);
    }

    let Some(timeout_ms) = args.timeout_ms else {
        supervisor
            .spawn_with_progress(&args.program, args.args, options)
            .await?;
        return Ok(());
    };

    let handle = if options.verbosity == Verbosity::Output {
        supervisor.spawn_child_process(&args.program, args.args, options)
    } else {
        supervisor.spawn(&args.program, args.args, options)
    };
    let (process, _, mut outcome) = handle.into_parts();
    let subject = outcome.subject().to_string();

    tokio::select! {
        res = &mut outcome => {
            res?;
            supervisor.logger().log_stream(b"\n", StreamSink::Stdout);
            info!(program = %args.program, "process finished before timeout");
            Ok(())
        }
        _ = tokio::time::sleep(Duration::from_millis(timeout_ms)) => {
            warn!(program = %args.program, timeout_ms, "timeout elapsed; stopping process");
            supervisor.kill(Some(&process)).await?;
            // Let the process finish exiting before reporting.
            let _ = outcome.await;
            Err(ProcsupError::Other(anyhow!(
                "`{subject}` did not finish within {timeout_ms} ms"
            )))
        }
    }
}
