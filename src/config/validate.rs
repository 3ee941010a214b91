// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ProcsupError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ProcsupError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.supervisor, raw.env))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_supervisor_section(cfg)?;
    validate_env(cfg)?;
    Ok(())
}

fn validate_supervisor_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.supervisor.heartbeat_interval_ms == 0 {
        return Err(ProcsupError::ConfigError(
            "[supervisor].heartbeat_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(ref dir) = cfg.supervisor.working_dir {
        if dir.as_os_str().is_empty() {
            return Err(ProcsupError::ConfigError(
                "[supervisor].working_dir must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_env(cfg: &RawConfigFile) -> Result<()> {
    for (name, value) in cfg.env.iter() {
        if name.is_empty() {
            return Err(ProcsupError::ConfigError(
                "[env] contains an empty variable name".to_string(),
            ));
        }
        if name.contains('=') || name.contains('\0') {
            return Err(ProcsupError::ConfigError(format!(
                "[env] variable name '{}' must not contain '=' or NUL",
                name
            )));
        }
        if value.contains('\0') {
            return Err(ProcsupError::ConfigError(format!(
                "[env] value of '{}' must not contain NUL",
                name
            )));
        }
    }
    Ok(())
}
