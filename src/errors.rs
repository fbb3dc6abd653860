// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ProcessError`] covers everything the process handle can report. Some
//!   variants are operational (logged, supervision continues), the rest are
//!   fatal; [`ProcessError::is_fatal`] tells them apart.
//! - [`ScanError`] is returned when the watch root itself cannot be observed.
//! - [`RerunError`] is the top-level error that may end the program.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RerunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The process bookkeeping is no longer trustworthy.
    #[error("Fatal process error: {0}")]
    Fatal(#[source] ProcessError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ProcessError> for RerunError {
    fn from(err: ProcessError) -> Self {
        RerunError::Fatal(err)
    }
}

/// Errors raised by a process handle.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The command line contained no executable.
    #[error("command is empty")]
    EmptyCommand,

    /// The output pipe could not be created.
    #[error("failed to create output pipe: {0}")]
    Pipe(#[source] io::Error),

    /// The OS refused to create the process (fork, chdir or exec failed).
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Reading the child's output failed.
    #[error("failed to read process output: {0}")]
    Read(#[source] io::Error),

    /// `waitpid` (or the platform equivalent) failed in an unexpected way.
    #[error("waiting on process {pid} failed: {reason}")]
    Wait { pid: i64, reason: String },

    /// Delivering a termination signal failed for a reason other than the
    /// target already being gone.
    #[error("signalling process group {pid} failed: {reason}")]
    Signal { pid: i64, reason: String },

    /// The post-creation "no such child" race did not resolve in time.
    #[error("process {pid} vanished: no child after {attempts} attempts")]
    RaceRetriesExhausted { pid: i64, attempts: u32 },
}

impl ProcessError {
    /// Fatal errors leave the process state unknowable and must end the
    /// program; everything else is logged and supervision continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProcessError::Wait { .. }
                | ProcessError::Signal { .. }
                | ProcessError::RaceRetriesExhausted { .. }
        )
    }

    /// Short stable label for structured logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessError::EmptyCommand => "process_empty_command",
            ProcessError::Pipe(_) => "process_pipe",
            ProcessError::Spawn { .. } => "process_spawn",
            ProcessError::Read(_) => "process_read",
            ProcessError::Wait { .. } => "process_wait",
            ProcessError::Signal { .. } => "process_signal",
            ProcessError::RaceRetriesExhausted { .. } => "process_race_exhausted",
        }
    }
}

/// The watch root could not be observed at all.
#[derive(Error, Debug)]
#[error("cannot scan {path:?}: {cause:#}")]
pub struct ScanError {
    pub path: PathBuf,
    pub cause: anyhow::Error,
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RerunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operational_errors_are_not_fatal() {
        let spawn = ProcessError::Spawn {
            program: "nope".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(!spawn.is_fatal());
        assert!(!ProcessError::EmptyCommand.is_fatal());
        assert!(!ProcessError::Read(io::Error::from(io::ErrorKind::BrokenPipe)).is_fatal());
    }

    #[test]
    fn bookkeeping_errors_are_fatal() {
        let err = ProcessError::RaceRetriesExhausted { pid: 42, attempts: 3 };
        assert!(err.is_fatal());
        assert_eq!(err.as_label(), "process_race_exhausted");

        let top: RerunError = err.into();
        assert!(matches!(top, RerunError::Fatal(_)));
    }
}
