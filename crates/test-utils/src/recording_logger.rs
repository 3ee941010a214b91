use std::sync::{Arc, Mutex};

use procsup::logger::{Logger, StreamSink};

/// One call made against a [`RecordingLogger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Debug(String),
    Info(String),
    Warning(String),
    Stream(StreamSink, Vec<u8>),
}

/// A logger that remembers every call, in order.
///
/// Clones share the same record, so keep one clone in the test and hand the
/// other to the supervisor.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Raw chunks sent to `sink`, in order.
    pub fn stream_chunks(&self, sink: StreamSink) -> Vec<Vec<u8>> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                LogEntry::Stream(s, data) if s == sink => Some(data),
                _ => None,
            })
            .collect()
    }

    /// Everything sent to `sink`, concatenated and decoded lossily.
    pub fn stream_text(&self, sink: StreamSink) -> String {
        let bytes: Vec<u8> = self.stream_chunks(sink).concat();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn debug_lines(&self) -> Vec<String> {
        self.lines(|e| match e {
            LogEntry::Debug(s) => Some(s),
            _ => None,
        })
    }

    pub fn info_lines(&self) -> Vec<String> {
        self.lines(|e| match e {
            LogEntry::Info(s) => Some(s),
            _ => None,
        })
    }

    pub fn warnings(&self) -> Vec<String> {
        self.lines(|e| match e {
            LogEntry::Warning(s) => Some(s),
            _ => None,
        })
    }

    fn lines(&self, pick: impl Fn(LogEntry) -> Option<String>) -> Vec<String> {
        self.entries().into_iter().filter_map(pick).collect()
    }

    fn push(&self, entry: LogEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

impl Logger for RecordingLogger {
    fn debug(&self, text: &str) {
        self.push(LogEntry::Debug(text.to_string()));
    }

    fn info(&self, text: &str) {
        self.push(LogEntry::Info(text.to_string()));
    }

    fn warning(&self, text: &str) {
        self.push(LogEntry::Warning(text.to_string()));
    }

    fn log_stream(&self, chunk: &[u8], sink: StreamSink) {
        self.push(LogEntry::Stream(sink, chunk.to_vec()));
    }
}
