// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::RawConfigFile;

/// Command-line arguments for `rerun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rerun",
    version,
    about = "Run a command and restart it whenever files under a directory change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a config file (TOML).
    ///
    /// If omitted, `Rerun.toml` in the current directory is used when present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// File or directory to watch for changes.
    #[arg(short, long, value_name = "DIR")]
    pub watch: Option<PathBuf>,

    /// Working directory for the command.
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Time between supervision cycles, in milliseconds.
    #[arg(long, value_name = "N")]
    pub interval_ms: Option<u64>,

    /// Number of log lines to keep.
    #[arg(long, value_name = "N")]
    pub log_capacity: Option<usize>,

    /// Grace period between SIGTERM and SIGKILL, in milliseconds.
    #[arg(long, value_name = "N")]
    pub kill_grace_ms: Option<u64>,

    /// Glob pattern (relative to the watch path) to ignore. Repeatable.
    ///
    /// Added to any `exclude` list from the config file.
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Do not start the command until `start` is typed on the console.
    #[arg(long)]
    pub paused: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RERUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// The command to supervise, after `--`.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl CliArgs {
    /// Overlay the flags that were given onto a config loaded from disk.
    pub fn apply_to(&self, raw: &mut RawConfigFile) {
        if let Some(watch) = &self.watch {
            raw.watch.path = watch.clone();
        }
        raw.watch.exclude.extend(self.exclude.iter().cloned());

        if !self.command.is_empty() {
            raw.process.command = Some(self.command.join(" "));
        }
        if let Some(dir) = &self.dir {
            raw.process.working_dir = Some(dir.clone());
        }
        if let Some(ms) = self.kill_grace_ms {
            raw.process.kill_grace_ms = ms;
        }
        if self.paused {
            raw.process.autostart = false;
        }

        if let Some(ms) = self.interval_ms {
            raw.supervisor.poll_interval_ms = ms;
        }
        if let Some(n) = self.log_capacity {
            raw.supervisor.log_capacity = n;
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_after_double_dash() {
        let args = CliArgs::try_parse_from(["rerun", "-w", "src", "--", "cargo", "run"]).unwrap();
        assert_eq!(args.watch, Some(PathBuf::from("src")));
        assert_eq!(args.command, vec!["cargo", "run"]);
    }

    #[test]
    fn flags_override_config_values() {
        let args = CliArgs::try_parse_from([
            "rerun",
            "--interval-ms",
            "50",
            "--exclude",
            "target",
            "--paused",
            "--",
            "sleep",
            "5",
        ])
        .unwrap();

        let mut raw = RawConfigFile::default();
        raw.process.command = Some("from config".into());
        raw.watch.exclude = vec!["*.swp".into()];
        args.apply_to(&mut raw);

        assert_eq!(raw.process.command.as_deref(), Some("sleep 5"));
        assert_eq!(raw.supervisor.poll_interval_ms, 50);
        assert_eq!(raw.watch.exclude, vec!["*.swp", "target"]);
        assert!(!raw.process.autostart);
    }

    #[test]
    fn absent_flags_leave_config_alone() {
        let args = CliArgs::try_parse_from(["rerun"]).unwrap();
        let mut raw = RawConfigFile::default();
        raw.process.command = Some("make".into());
        raw.process.kill_grace_ms = 10;
        args.apply_to(&mut raw);

        assert_eq!(raw.process.command.as_deref(), Some("make"));
        assert_eq!(raw.process.kill_grace_ms, 10);
        assert!(raw.process.autostart);
    }
}
