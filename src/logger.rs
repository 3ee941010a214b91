// src/logger.rs

//! Logger collaborator used by the supervisor.
//!
//! The supervisor never writes to a global sink directly; it is handed an
//! `Arc<dyn Logger>` at construction. Production code uses [`TracingLogger`],
//! tests plug in a recording implementation, and callers that want silence
//! use [`NullLogger`].

use std::io::{self, Write};

use tracing::{debug, info, warn};

/// Which display stream a raw chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamSink {
    Stdout,
    Stderr,
}

/// Sink for leveled log lines and raw child output.
pub trait Logger: Send + Sync {
    fn debug(&self, text: &str);
    fn info(&self, text: &str);
    fn warning(&self, text: &str);

    /// Forward a raw chunk of output (or a marker such as `"."`) unchanged.
    fn log_stream(&self, chunk: &[u8], sink: StreamSink);
}

/// Logger backed by `tracing` for leveled lines and the real stdout/stderr
/// for raw stream data.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, text: &str) {
        debug!("{text}");
    }

    fn info(&self, text: &str) {
        info!("{text}");
    }

    fn warning(&self, text: &str) {
        warn!("{text}");
    }

    fn log_stream(&self, chunk: &[u8], sink: StreamSink) {
        let res = match sink {
            StreamSink::Stdout => write_flush(&mut io::stdout().lock(), chunk),
            StreamSink::Stderr => write_flush(&mut io::stderr().lock(), chunk),
        };
        if let Err(e) = res {
            debug!(?sink, error = %e, "failed to write stream chunk");
        }
    }
}

fn write_flush(out: &mut impl Write, chunk: &[u8]) -> io::Result<()> {
    out.write_all(chunk)?;
    out.flush()
}

/// Logger that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn debug(&self, _text: &str) {}
    fn info(&self, _text: &str) {}
    fn warning(&self, _text: &str) {}
    fn log_stream(&self, _chunk: &[u8], _sink: StreamSink) {}
}
