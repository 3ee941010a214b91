// src/exec/outcome.rs

//! Single-resolution result of one supervised process.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::errors::{Cause, ErrorCode, ProcessError};

use super::backend::ExitInfo;

pub type OutcomeResult = std::result::Result<(), ProcessError>;

/// Future that settles exactly once, after the process has exited and both
/// of its pipes have closed.
///
/// Dropping an `Outcome` does not stop the process.
#[derive(Debug)]
pub struct Outcome {
    rx: oneshot::Receiver<OutcomeResult>,
    subject: String,
}

/// Producer side of an [`Outcome`]. Settling consumes it.
#[derive(Debug)]
pub(crate) struct OutcomeSender {
    tx: oneshot::Sender<OutcomeResult>,
}

impl Outcome {
    pub(crate) fn channel(subject: impl Into<String>) -> (OutcomeSender, Outcome) {
        let (tx, rx) = oneshot::channel();
        (
            OutcomeSender { tx },
            Outcome {
                rx,
                subject: subject.into(),
            },
        )
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl OutcomeSender {
    pub(crate) fn settle(self, result: OutcomeResult) {
        // The receiver may already be gone; nobody is waiting then.
        let _ = self.tx.send(result);
    }
}

impl Future for Outcome {
    type Output = OutcomeResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(ProcessError::wrap(
                Cause::Abandoned,
                ErrorCode::CommandFailed,
                self.subject.clone(),
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Turn how a process ended into its outcome.
///
/// A failing exit wins over a pipe read error; a read error on an otherwise
/// successful run still fails the outcome.
pub(crate) fn resolve(
    status: io::Result<ExitInfo>,
    read_error: Option<io::Error>,
    subject: &str,
) -> OutcomeResult {
    let fail = |cause: Cause| ProcessError::wrap(cause, ErrorCode::CommandFailed, subject);

    let exit = status.map_err(|e| fail(Cause::Io(e)))?;
    if !exit.success() {
        return Err(fail(Cause::Exit {
            code: exit.code,
            stderr: None,
        }));
    }
    if let Some(e) = read_error {
        return Err(fail(Cause::Io(e)));
    }
    Ok(())
}
