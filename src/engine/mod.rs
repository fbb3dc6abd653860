// src/engine/mod.rs

//! Supervision engine for rerun.
//!
//! This module ties together:
//! - the change watcher (has anything below the watch path changed?)
//! - the process handle (is the command alive, and how did it end?)
//! - the log buffer the front end renders
//! - control intents coming from the console or signal handlers
//!
//! The synchronous core lives in [`core`]; the pure per-cycle decisions it
//! relies on are in [`decisions`]. The async/IO shell is implemented in
//! [`runtime`], and [`console`] turns stdin lines into intents.

use std::path::PathBuf;

use crate::types::ProcessStatus;

pub mod console;
pub mod core;
pub mod decisions;
pub mod runtime;

pub use core::{Supervisor, SupervisorOptions};
pub use decisions::Trigger;
pub use runtime::{Frontend, HeadlessFrontend, Runtime};

/// Everything the supervisor knows about the one command it drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTask {
    pub watch_directory: PathBuf,
    /// Directory the command is started in. Empty means "inherit ours".
    pub working_directory: PathBuf,
    pub command: String,
    pub desired_running: bool,
    /// The watch path could not be scanned; cleared by a new path or by
    /// re-enabling the task.
    pub folder_invalid: bool,
    /// Latest mtime seen, in nanoseconds. `0` means nothing observed yet.
    pub last_modified_time: u64,
    /// An explicit start was requested and has not been honoured yet.
    pub pending_start: bool,
    pub exclude: Vec<String>,
}

impl WatchTask {
    pub fn new(
        watch_directory: impl Into<PathBuf>,
        working_directory: impl Into<PathBuf>,
        command: impl Into<String>,
        autostart: bool,
    ) -> Self {
        Self {
            watch_directory: watch_directory.into(),
            working_directory: working_directory.into(),
            command: command.into(),
            desired_running: autostart,
            folder_invalid: false,
            last_modified_time: 0,
            pending_start: autostart,
            exclude: Vec::new(),
        }
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }
}

/// Requests from outside the loop. Applied at the start of a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlIntent {
    SetWatchPath(PathBuf),
    SetCommand(String),
    SetWorkingDirectory(PathBuf),
    SetRunning(bool),
    ToggleRunning,
    /// Restart right away if running; otherwise behaves like a start request.
    Restart,
    /// Write a one-line summary of the current state to the log.
    Status,
    Shutdown,
}

/// Something the core did during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleAction {
    Started,
    Restarted,
    StartFailed,
    Stopped,
    /// The command exited with an error and was not restarted.
    AutoStopped,
    /// The watch path could not be scanned.
    FolderInvalid,
    /// Supervision was paused because the watch path stayed invalid.
    PausedInvalid,
}

/// Summary of one cycle, for the shell and for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub status: ProcessStatus,
    pub actions: Vec<CycleAction>,
    /// Child output lines added to the log this cycle.
    pub output_lines: usize,
    /// Result of this cycle's scan, if one ran and succeeded.
    pub scanned: Option<u64>,
}

impl Default for CycleReport {
    fn default() -> Self {
        Self {
            status: ProcessStatus::NotRunning,
            actions: Vec::new(),
            output_lines: 0,
            scanned: None,
        }
    }
}

impl CycleReport {
    pub fn did(&self, action: CycleAction) -> bool {
        self.actions.contains(&action)
    }

    /// True if a process was (re)started this cycle.
    pub fn launched(&self) -> bool {
        self.did(CycleAction::Started) || self.did(CycleAction::Restarted)
    }
}
