// src/types.rs

use std::fmt;

/// Point-in-time classification of the supervised process.
///
/// This is recomputed from the OS on every poll and never stored. The
/// `Died*` variants are reported exactly once: the poll that observes them
/// also resets the handle, so the next poll returns `NotRunning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessStatus {
    NotRunning,
    StillAlive,
    /// Exited normally with a non-zero status.
    DiedError,
    /// Terminated by a signal.
    DiedKilled,
    /// Exited normally with status zero.
    DiedCorrectly,
}

impl ProcessStatus {
    pub fn is_alive(self) -> bool {
        matches!(self, ProcessStatus::StillAlive)
    }

    pub fn is_death(self) -> bool {
        matches!(
            self,
            ProcessStatus::DiedError | ProcessStatus::DiedKilled | ProcessStatus::DiedCorrectly
        )
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessStatus::NotRunning => "not running",
            ProcessStatus::StillAlive => "running",
            ProcessStatus::DiedError => "exited with an error",
            ProcessStatus::DiedKilled => "killed by a signal",
            ProcessStatus::DiedCorrectly => "exited cleanly",
        };
        f.write_str(s)
    }
}

/// Where a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSource {
    /// Written by the supervisor itself.
    Supervisor,
    /// Captured from the child's combined stdout/stderr.
    Child,
}
