// src/config/validate.rs

use crate::config::model::{RawConfigFile, Settings};
use crate::errors::{RerunError, Result};
use crate::process::CommandLine;
use crate::watch::ExcludeSet;

impl TryFrom<RawConfigFile> for Settings {
    type Error = RerunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let command = validate_command(&raw)?;
        validate_supervisor(&raw)?;
        validate_exclude(&raw)?;
        Ok(Settings::new_unchecked(raw, command))
    }
}

fn validate_command(cfg: &RawConfigFile) -> Result<String> {
    let command = cfg.process.command.as_deref().unwrap_or("").trim();
    if CommandLine::parse(command).is_none() {
        return Err(RerunError::ConfigError(
            "no command given: pass one after `--` or set [process].command".to_string(),
        ));
    }
    Ok(command.to_string())
}

fn validate_supervisor(cfg: &RawConfigFile) -> Result<()> {
    if cfg.supervisor.poll_interval_ms == 0 {
        return Err(RerunError::ConfigError(
            "[supervisor].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.supervisor.log_capacity == 0 {
        return Err(RerunError::ConfigError(
            "[supervisor].log_capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.watch.path.as_os_str().is_empty() {
        return Err(RerunError::ConfigError(
            "[watch].path must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_exclude(cfg: &RawConfigFile) -> Result<()> {
    ExcludeSet::new(&cfg.watch.exclude)
        .map(|_| ())
        .map_err(|e| RerunError::ConfigError(format!("[watch].exclude: {e:#}")))
}
