// src/process/mod.rs

//! Process handle layer.
//!
//! This module owns exactly one supervised child at a time and answers:
//! - is it alive, and if not, how did it end?
//! - what did it print since the last drain?
//!
//! - [`command`] splits a command string into program and arguments.
//! - [`lines`] turns drained bytes into log lines.
//! - [`ProcessControl`] is the seam the supervisor talks to. Tests provide
//!   their own implementation that never spawns anything.
//! - [`ProcessHandle`] is the real implementation for the current platform.
//!
//! All calls are synchronous. `poll_status` never blocks except for the
//! short bounded retry described on [`ProcessControl::poll_status`];
//! `terminate` blocks until the child is gone.

pub mod command;
pub mod lines;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

use std::path::Path;
use std::time::Duration;

use crate::errors::ProcessError;
use crate::types::ProcessStatus;

pub use command::CommandLine;
pub use lines::LineAssembler;

#[cfg(unix)]
pub use unix::UnixProcess as ProcessHandle;
#[cfg(windows)]
pub use windows::WindowsProcess as ProcessHandle;

/// Grace period between the polite and the forced termination request.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(3);

/// Upper bound on bytes pulled out of the pipe by a single drain.
pub const MAX_DRAIN_BYTES: usize = 64 * 1024;

/// Operations the supervisor needs from a process handle.
pub trait ProcessControl {
    /// Launch `command` in `working_dir` with output captured.
    ///
    /// If a child is already running it is terminated first, so the handle
    /// never owns more than one. An empty `working_dir` means "inherit".
    /// The child gets its own process group so that terminating it also
    /// reaches anything it spawned.
    fn start(&mut self, working_dir: &Path, command: &str) -> Result<(), ProcessError>;

    /// Non-blocking liveness check.
    ///
    /// A death status is returned once; afterwards the handle reports
    /// [`ProcessStatus::NotRunning`]. A "no such child" answer right after
    /// start is retried a few times with a short pause before it becomes a
    /// fatal [`ProcessError::RaceRetriesExhausted`].
    fn poll_status(&mut self) -> Result<ProcessStatus, ProcessError>;

    /// Stop the child and everything in its group, then reap it.
    /// A no-op when nothing is running, and safe to call repeatedly.
    fn terminate(&mut self) -> Result<(), ProcessError>;

    /// `terminate` followed by `start`.
    fn restart(&mut self, working_dir: &Path, command: &str) -> Result<(), ProcessError> {
        self.terminate()?;
        self.start(working_dir, command)
    }

    /// Append whatever output is available to `out`, waiting at most
    /// `timeout` for the first byte. Returns how many bytes were appended.
    ///
    /// Output produced just before the child died is still returned by the
    /// first drain after the death was observed.
    fn drain_output(&mut self, out: &mut Vec<u8>, timeout: Duration) -> Result<usize, ProcessError>;

    fn is_running(&self) -> bool;

    /// OS identifier of the running child.
    fn id(&self) -> Option<u32>;
}
