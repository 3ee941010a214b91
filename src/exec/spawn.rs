// src/exec/spawn.rs

//! Spawn supervisor: start one process, wire its pipes through the relay and
//! settle its outcome.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{Cause, ErrorCode, ProcessError};
use crate::logger::StreamSink;

use super::backend::{LaunchedProcess, ProcessBackend};
use super::invocation::CommandInvocation;
use super::outcome::{Outcome, OutcomeSender, resolve};
use super::relay::{OutputChunk, StreamRelay, pump};

/// Shared reference to a (possibly) running OS process.
///
/// Cheap to clone; callers may keep their own copy to stop the process
/// later while the supervisor keeps observing it.
#[derive(Debug, Clone)]
pub struct ProcessRef {
    pid: Option<u32>,
    exited: Arc<AtomicBool>,
}

impl ProcessRef {
    /// Reference a process started elsewhere.
    pub fn from_pid(pid: u32) -> Self {
        Self {
            pid: Some(pid),
            exited: Arc::new(AtomicBool::new(false)),
        }
    }

    fn not_started() -> Self {
        Self {
            pid: None,
            exited: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// True while the process has a pid and has not been observed to exit.
    pub fn is_live(&self) -> bool {
        self.pid.is_some() && !self.exited.load(Ordering::Acquire)
    }

    fn mark_exited(&self) {
        self.exited.store(true, Ordering::Release);
    }
}

/// Live copy of everything the child writes, in arrival order per stream.
///
/// Only fed when the invocation asked for captured output; otherwise it ends
/// straight away. Captured chunks are buffered until read.
#[derive(Debug)]
pub struct OutputStream {
    rx: mpsc::UnboundedReceiver<OutputChunk>,
}

impl OutputStream {
    /// Next chunk, or `None` once both pipes have closed.
    pub async fn next(&mut self) -> Option<OutputChunk> {
        self.rx.recv().await
    }

    /// Drain the stream, keeping only the bytes written to `sink`.
    pub async fn collect(mut self, sink: StreamSink) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = self.rx.recv().await {
            if chunk.sink == sink {
                out.extend_from_slice(&chunk.data);
            }
        }
        out
    }

    /// Drain the stream into separate stdout and stderr buffers.
    pub async fn collect_split(mut self) -> (Vec<u8>, Vec<u8>) {
        let (mut stdout, mut stderr) = (Vec::new(), Vec::new());
        while let Some(chunk) = self.rx.recv().await {
            match chunk.sink {
                StreamSink::Stdout => stdout.extend_from_slice(&chunk.data),
                StreamSink::Stderr => stderr.extend_from_slice(&chunk.data),
            }
        }
        (stdout, stderr)
    }
}

/// Live representation of a spawned process.
#[derive(Debug)]
pub struct SpawnHandle {
    process: ProcessRef,
    output: OutputStream,
    outcome: Outcome,
}

impl SpawnHandle {
    pub fn process(&self) -> &ProcessRef {
        &self.process
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.pid()
    }

    pub fn output(&mut self) -> &mut OutputStream {
        &mut self.output
    }

    pub fn into_parts(self) -> (ProcessRef, OutputStream, Outcome) {
        (self.process, self.output, self.outcome)
    }

    /// Wait for the process to finish, discarding the live output.
    pub async fn wait(self) -> Result<(), ProcessError> {
        let (_, output, outcome) = self.into_parts();
        drop(output);
        outcome.await
    }
}

/// Launch `invocation` via `backend` and supervise it in a background task.
///
/// Returns immediately. `end_line`, if set, is logged at debug level once
/// the process has finished successfully.
pub(crate) fn spawn_supervised(
    backend: &dyn ProcessBackend,
    invocation: &CommandInvocation,
    relay: StreamRelay,
    end_line: Option<String>,
) -> SpawnHandle {
    let subject = invocation.subject();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (outcome_tx, outcome) = Outcome::channel(subject.clone());
    let output = OutputStream { rx: out_rx };
    let out_tx = invocation.captures_output().then_some(out_tx);

    let launched = match backend.launch(invocation) {
        Ok(launched) => launched,
        Err(e) => {
            warn!(cmd = %subject, error = %e, "failed to launch process");
            outcome_tx.settle(Err(ProcessError::wrap(
                Cause::Launch(e),
                ErrorCode::CommandFailed,
                subject,
            )));
            return SpawnHandle {
                process: ProcessRef::not_started(),
                output,
                outcome,
            };
        }
    };

    let process = match launched.pid {
        Some(pid) => ProcessRef::from_pid(pid),
        None => ProcessRef::not_started(),
    };
    info!(cmd = %subject, pid = ?launched.pid, "process started");

    tokio::spawn(supervise(
        launched,
        relay,
        out_tx,
        outcome_tx,
        process.clone(),
        subject,
        end_line,
    ));

    SpawnHandle {
        process,
        output,
        outcome,
    }
}

async fn supervise(
    launched: LaunchedProcess,
    mut relay: StreamRelay,
    out_tx: Option<mpsc::UnboundedSender<OutputChunk>>,
    outcome_tx: OutcomeSender,
    process: ProcessRef,
    subject: String,
    end_line: Option<String>,
) {
    let LaunchedProcess {
        stdout,
        stderr,
        exit,
        ..
    } = launched;

    let (chunk_tx, mut chunk_rx) = mpsc::unbounded_channel::<OutputChunk>();
    let streams = [(stdout, StreamSink::Stdout), (stderr, StreamSink::Stderr)];
    let pumps: Vec<JoinHandle<io::Result<()>>> = streams
        .into_iter()
        .filter_map(|(reader, sink)| reader.map(|r| tokio::spawn(pump(r, sink, chunk_tx.clone()))))
        .collect();
    drop(chunk_tx);

    // The pid is dead once reaped, even if a grandchild still holds a pipe.
    let reaped = async {
        let status = exit.await;
        process.mark_exited();
        status
    };
    // Relay until every pump has hung up.
    let relay_loop = async {
        while let Some(chunk) = chunk_rx.recv().await {
            relay.forward(&chunk);
            if let Some(tx) = &out_tx {
                let _ = tx.send(chunk);
            }
        }
    };
    let (status, ()) = tokio::join!(reaped, relay_loop);
    drop(out_tx);

    let mut read_error = None;
    for pump in pumps {
        let res = match pump.await {
            Ok(res) => res,
            Err(join_err) => Err(io::Error::other(join_err)),
        };
        if let Err(e) = res {
            if read_error.is_none() {
                read_error = Some(e);
            }
        }
    }

    let result = resolve(status, read_error, &subject);
    match &result {
        Ok(()) => {
            info!(cmd = %subject, "process finished successfully");
            if let Some(line) = end_line {
                relay.logger().debug(&line);
            }
        }
        Err(e) => {
            debug!(cmd = %subject, error = %e, "process failed");
        }
    }

    outcome_tx.settle(result);
}
