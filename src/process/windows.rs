// src/process/windows.rs

//! Windows process handle.
//!
//! There is no non-blocking pipe read on Windows, so a reader thread copies
//! the output pipe into a channel and `drain_output` empties the channel.
//! `Child::kill` ends only the direct child; grandchildren that outlive it
//! are not reached.

use std::io::{self, Read};
use std::os::windows::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, error::TryRecvError};
use tracing::{debug, info, warn};

use super::{CommandLine, DEFAULT_KILL_GRACE, MAX_DRAIN_BYTES, ProcessControl};
use crate::errors::ProcessError;
use crate::types::ProcessStatus;

const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

#[derive(Debug)]
struct Running {
    child: Child,
    output: UnboundedReceiver<Vec<u8>>,
}

#[derive(Debug)]
pub struct WindowsProcess {
    running: Option<Running>,
    pending: Vec<u8>,
}

impl Default for WindowsProcess {
    fn default() -> Self {
        Self::new(DEFAULT_KILL_GRACE)
    }
}

impl WindowsProcess {
    /// `Child::kill` is immediate, so the grace period has nothing to wait for.
    pub fn new(_kill_grace: Duration) -> Self {
        Self {
            running: None,
            pending: Vec::new(),
        }
    }

    fn release(&mut self) {
        if let Some(mut running) = self.running.take() {
            while let Ok(chunk) = running.output.try_recv() {
                self.pending.extend_from_slice(&chunk);
            }
        }
    }
}

impl ProcessControl for WindowsProcess {
    fn start(&mut self, working_dir: &Path, command: &str) -> Result<(), ProcessError> {
        let line = CommandLine::parse(command).ok_or(ProcessError::EmptyCommand)?;
        if self.running.is_some() {
            self.terminate()?;
        }

        let (mut reader, writer) = io::pipe().map_err(ProcessError::Pipe)?;
        let writer_err = writer.try_clone().map_err(ProcessError::Pipe)?;

        let mut cmd = Command::new(&line.program);
        cmd.args(&line.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(writer))
            .stderr(Stdio::from(writer_err))
            .creation_flags(CREATE_NEW_PROCESS_GROUP);
        if !working_dir.as_os_str().is_empty() {
            cmd.current_dir(working_dir);
        }
        let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: line.program.clone(),
            source,
        })?;
        drop(cmd);

        let (tx, rx) = mpsc::unbounded_channel();
        thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!(error = %e, "output reader stopped");
                        break;
                    }
                }
            }
        });

        info!(pid = child.id(), cmd = %line, cwd = %working_dir.display(), "started process");
        self.running = Some(Running { child, output: rx });
        Ok(())
    }

    fn poll_status(&mut self) -> Result<ProcessStatus, ProcessError> {
        let Some(running) = self.running.as_mut() else {
            return Ok(ProcessStatus::NotRunning);
        };
        let pid = running.child.id();
        let status = match running.child.try_wait() {
            Ok(None) => return Ok(ProcessStatus::StillAlive),
            // Windows has no separate "killed" exit; any nonzero code is an error.
            Ok(Some(status)) if status.success() => ProcessStatus::DiedCorrectly,
            Ok(Some(_)) => ProcessStatus::DiedError,
            Err(e) => {
                return Err(ProcessError::Wait {
                    pid: pid.into(),
                    reason: e.to_string(),
                });
            }
        };
        self.release();
        Ok(status)
    }

    fn terminate(&mut self) -> Result<(), ProcessError> {
        let Some(running) = self.running.as_mut() else {
            return Ok(());
        };
        let pid = running.child.id();

        match running.child.kill() {
            Ok(()) => {}
            // Already exited but not yet reaped.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => {
                return Err(ProcessError::Signal {
                    pid: pid.into(),
                    reason: e.to_string(),
                });
            }
        }
        running.child.wait().map_err(|e| ProcessError::Wait {
            pid: pid.into(),
            reason: e.to_string(),
        })?;

        info!(pid, "terminated process");
        self.release();
        Ok(())
    }

    fn drain_output(&mut self, out: &mut Vec<u8>, _timeout: Duration) -> Result<usize, ProcessError> {
        let mut appended = self.pending.len();
        out.append(&mut self.pending);

        let Some(running) = self.running.as_mut() else {
            return Ok(appended);
        };
        while appended < MAX_DRAIN_BYTES {
            match running.output.try_recv() {
                Ok(chunk) => {
                    appended += chunk.len();
                    out.extend_from_slice(&chunk);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        Ok(appended)
    }

    fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn id(&self) -> Option<u32> {
        self.running.as_ref().map(|r| r.child.id())
    }
}

impl Drop for WindowsProcess {
    fn drop(&mut self) {
        if let Err(e) = self.terminate() {
            warn!(error = %e, "failed to terminate process on drop");
        }
    }
}
