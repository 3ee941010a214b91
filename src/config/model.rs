// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::supervisor::SupervisorBuilder;
use crate::types::Verbosity;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [supervisor]
/// working_dir = "."
/// heartbeat_interval_ms = 1500
/// verbosity = "progress"
///
/// [env]
/// RUST_LOG = "info"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub supervisor: SupervisorSection,

    /// Variables set for every spawned process, on top of the inherited
    /// environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[supervisor]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorSection {
    /// Directory processes run in unless a call overrides it.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Minimum spacing between progress markers.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Verbosity used by `procsup run` when `--verbosity` is not given.
    #[serde(default)]
    pub verbosity: Verbosity,
}

fn default_heartbeat_interval_ms() -> u64 {
    1500
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            working_dir: None,
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            verbosity: Verbosity::default(),
        }
    }
}

/// Validated configuration. Build one with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub supervisor: SupervisorSection,
    pub env: BTreeMap<String, String>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        supervisor: SupervisorSection,
        env: BTreeMap<String, String>,
    ) -> Self {
        Self { supervisor, env }
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.supervisor.heartbeat_interval_ms)
    }

    /// A supervisor builder seeded from this configuration.
    pub fn supervisor_builder(&self) -> SupervisorBuilder {
        let mut builder = SupervisorBuilder::new().heartbeat_interval(self.heartbeat_interval());

        if let Some(ref dir) = self.supervisor.working_dir {
            builder = builder.working_dir(dir.clone());
        }
        for (key, value) in &self.env {
            builder = builder.env(key.clone(), value.clone());
        }
        builder
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.supervisor, raw.env)
    }
}
