// src/exec/relay.rs

//! Stream relay: what happens to each chunk a child writes.
//!
//! Both pipes are read by their own pump task, which pushes raw chunks into
//! one channel. The supervising task drains that channel and calls
//! [`StreamRelay::forward`] for every chunk, so relay state (the heartbeat in
//! particular) is only ever touched from one place.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::logger::{Logger, StreamSink};
use crate::types::Verbosity;

use super::backend::BoxedReader;
use super::heartbeat::{Heartbeat, PROGRESS_MARKER};

const READ_BUF_SIZE: usize = 8 * 1024;

/// One chunk of raw child output, as it came off the pipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub sink: StreamSink,
    pub data: Vec<u8>,
}

/// What the relay does with each chunk.
#[derive(Debug, Clone)]
pub enum RelayMode {
    /// Forward every chunk to the logger's stream sink unchanged.
    Passthrough,
    /// Emit a rate-limited progress marker instead of the chunk.
    Heartbeat(Heartbeat),
    /// Drop chunks.
    Discard,
}

impl RelayMode {
    pub fn for_verbosity(verbosity: Verbosity, heartbeat_interval: Duration) -> Self {
        match verbosity {
            Verbosity::Output => RelayMode::Passthrough,
            Verbosity::Progress => RelayMode::Heartbeat(Heartbeat::new(heartbeat_interval)),
            Verbosity::Silent => RelayMode::Discard,
        }
    }
}

pub struct StreamRelay {
    mode: RelayMode,
    logger: Arc<dyn Logger>,
}

impl StreamRelay {
    pub fn new(mode: RelayMode, logger: Arc<dyn Logger>) -> Self {
        Self { mode, logger }
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    pub fn forward(&mut self, chunk: &OutputChunk) {
        match &mut self.mode {
            RelayMode::Passthrough => self.logger.log_stream(&chunk.data, chunk.sink),
            RelayMode::Heartbeat(heartbeat) => {
                if heartbeat.tick(Instant::now()) {
                    self.logger.log_stream(PROGRESS_MARKER, StreamSink::Stdout);
                }
            }
            RelayMode::Discard => {}
        }
    }
}

/// Read `reader` until EOF, pushing every chunk into `tx`.
///
/// Keeps draining even if nobody listens anymore so the child never blocks
/// on a full pipe.
pub(crate) async fn pump(
    mut reader: BoxedReader,
    sink: StreamSink,
    tx: mpsc::UnboundedSender<OutputChunk>,
) -> io::Result<()> {
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut listening = true;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            debug!(?sink, "output stream closed");
            return Ok(());
        }

        trace!(?sink, bytes = n, "read output chunk");
        if listening
            && tx
                .send(OutputChunk {
                    sink,
                    data: buf[..n].to_vec(),
                })
                .is_err()
        {
            listening = false;
        }
    }
}
