// src/exec/heartbeat.rs

use std::time::{Duration, Instant};

/// Default minimum spacing between two progress markers.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1500);

/// Marker written to the stdout sink for each heartbeat.
pub const PROGRESS_MARKER: &[u8] = b".";

/// Rate limiter for the "still alive" progress marker.
///
/// One instance per supervised process; it is never shared between spawns.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    last_emitted: Option<Instant>,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emitted: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record a candidate event at `now`.
    ///
    /// Returns `true` if a marker should be emitted, i.e. no marker has been
    /// emitted yet or more than `interval` has passed since the last one.
    /// Dropped events do not move the timestamp.
    pub fn tick(&mut self, now: Instant) -> bool {
        let due = match self.last_emitted {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.interval,
        };

        if due {
            self.last_emitted = Some(now);
        }
        due
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_INTERVAL)
    }
}
