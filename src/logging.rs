// src/logging.rs

//! Diagnostic logging via `tracing`, written to stderr.
//!
//! These are the supervisor's own diagnostics, separate from the in-memory
//! [`LogBuffer`](crate::log_buffer::LogBuffer) the frontend renders.
//!
//! Filter selection: `--log-level` wins, then any directives in `RERUN_LOG`
//! (full `EnvFilter` syntax, e.g. `rerun::process=debug,info`), then `info`.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "RERUN_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV_VAR).ok();
    let directives = filter_directives(cli_level, env_value.as_deref());
    let filter = EnvFilter::try_new(&directives)
        .map_err(|e| anyhow!("invalid log filter `{directives}`: {e}"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

/// Pick the filter string. An unparsable `RERUN_LOG` is ignored rather
/// than aborting startup.
fn filter_directives(cli_level: Option<LogLevel>, env_value: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return level_name(level).to_string();
    }
    match env_value.map(str::trim) {
        Some(env) if !env.is_empty() && EnvFilter::try_new(env).is_ok() => env.to_string(),
        _ => DEFAULT_DIRECTIVES.to_string(),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_environment() {
        assert_eq!(filter_directives(Some(LogLevel::Trace), Some("error")), "trace");
        assert_eq!(filter_directives(Some(LogLevel::Warn), None), "warn");
    }

    #[test]
    fn environment_directives_pass_through() {
        assert_eq!(
            filter_directives(None, Some(" rerun::process=debug,info ")),
            "rerun::process=debug,info"
        );
    }

    #[test]
    fn bad_or_missing_environment_falls_back_to_info() {
        assert_eq!(filter_directives(None, Some("rerun=shouty")), "info");
        assert_eq!(filter_directives(None, Some("   ")), "info");
        assert_eq!(filter_directives(None, None), "info");
    }
}
