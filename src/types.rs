use std::str::FromStr;
use serde::Deserialize;

/// How much of a child's output reaches the logger.
///
/// - `Output`: every stdout/stderr chunk is forwarded as it arrives, bracketed
///   by start/end debug lines.
/// - `Progress`: raw output is swallowed; a rate-limited `.` marker shows the
///   process is still alive.
/// - `Silent`: nothing is shown; only the final result matters (default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Output,
    Silent,
    Progress,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Silent
    }
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "output" => Ok(Verbosity::Output),
            "silent" => Ok(Verbosity::Silent),
            "progress" => Ok(Verbosity::Progress),
            other => Err(format!(
                "invalid verbosity: {other} (expected \"output\", \"silent\" or \"progress\")"
            )),
        }
    }
}
