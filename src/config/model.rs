// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::{SupervisorOptions, WatchTask};

/// Configuration as read from a TOML file.
///
/// ```toml
/// [watch]
/// path = "./src"
/// exclude = ["**/*.swp"]
///
/// [process]
/// command = "cargo run"
/// working_dir = "."
/// autostart = true
/// kill_grace_ms = 3000
///
/// [supervisor]
/// poll_interval_ms = 250
/// log_capacity = 256
/// drain_timeout_ms = 10
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,
    #[serde(default)]
    pub process: ProcessSection,
    #[serde(default)]
    pub supervisor: SupervisorSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// File or directory to watch. Defaults to the current directory.
    #[serde(default = "default_watch_path")]
    pub path: PathBuf,

    /// Glob patterns, relative to `path`, that the scanner skips.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_watch_path() -> PathBuf {
    PathBuf::from(".")
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            path: default_watch_path(),
            exclude: Vec::new(),
        }
    }
}

/// `[process]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessSection {
    /// Command line, split on whitespace. Required here or on the CLI.
    #[serde(default)]
    pub command: Option<String>,

    /// Where the command runs. Unset means the supervisor's own directory.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Start the command as soon as the supervisor comes up.
    #[serde(default = "default_autostart")]
    pub autostart: bool,

    /// How long a terminated process group gets before it is killed.
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
}

fn default_autostart() -> bool {
    true
}

fn default_kill_grace_ms() -> u64 {
    3_000
}

impl Default for ProcessSection {
    fn default() -> Self {
        Self {
            command: None,
            working_dir: None,
            autostart: default_autostart(),
            kill_grace_ms: default_kill_grace_ms(),
        }
    }
}

/// `[supervisor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorSection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of lines kept in the log buffer.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_log_capacity() -> usize {
    crate::log_buffer::DEFAULT_CAPACITY
}

fn default_drain_timeout_ms() -> u64 {
    10
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            log_capacity: default_log_capacity(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

/// Validated settings. Built from a [`RawConfigFile`] via `TryFrom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub watch_path: PathBuf,
    pub exclude: Vec<String>,
    pub command: String,
    /// Empty means "inherit".
    pub working_dir: PathBuf,
    pub autostart: bool,
    pub kill_grace: Duration,
    pub poll_interval: Duration,
    pub log_capacity: usize,
    pub drain_timeout: Duration,
}

impl Settings {
    /// Construct without validation. Prefer `Settings::try_from(raw)`.
    pub(crate) fn new_unchecked(raw: RawConfigFile, command: String) -> Self {
        Self {
            watch_path: raw.watch.path,
            exclude: raw.watch.exclude,
            command,
            working_dir: raw.process.working_dir.unwrap_or_default(),
            autostart: raw.process.autostart,
            kill_grace: Duration::from_millis(raw.process.kill_grace_ms),
            poll_interval: Duration::from_millis(raw.supervisor.poll_interval_ms),
            log_capacity: raw.supervisor.log_capacity,
            drain_timeout: Duration::from_millis(raw.supervisor.drain_timeout_ms),
        }
    }

    pub fn watch_task(&self) -> WatchTask {
        WatchTask::new(
            self.watch_path.clone(),
            self.working_dir.clone(),
            self.command.clone(),
            self.autostart,
        )
        .with_exclude(self.exclude.clone())
    }

    pub fn supervisor_options(&self) -> SupervisorOptions {
        SupervisorOptions {
            log_capacity: self.log_capacity,
            drain_timeout: self.drain_timeout,
        }
    }
}
