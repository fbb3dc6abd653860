// src/process/unix.rs

//! Unix process handle.
//!
//! The child is spawned as the leader of a new process group, so every
//! signal and wait below targets the whole group (`-pgid`). Stdout and
//! stderr share one non-blocking pipe.

use std::io::{self, PipeReader, Read};
use std::os::fd::{AsFd, AsRawFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::fcntl::{FcntlArg, OFlag, fcntl};
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::signal::{Signal, killpg};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use super::{CommandLine, DEFAULT_KILL_GRACE, MAX_DRAIN_BYTES, ProcessControl};
use crate::errors::ProcessError;
use crate::types::ProcessStatus;

/// Retries for a "no such child" answer from `waitpid`.
const RACE_RETRIES: u32 = 3;
const RACE_BACKOFF: Duration = Duration::from_millis(50);
/// How often `terminate` re-checks the group while waiting for it to exit.
const REAP_POLL: Duration = Duration::from_millis(10);

#[derive(Debug)]
struct Running {
    pgid: Pid,
    /// `None` once the pipe reported EOF.
    reader: Option<PipeReader>,
}

#[derive(Debug)]
pub struct UnixProcess {
    running: Option<Running>,
    /// Output salvaged from a child that has already been reaped.
    pending: Vec<u8>,
    kill_grace: Duration,
}

impl Default for UnixProcess {
    fn default() -> Self {
        Self::new(DEFAULT_KILL_GRACE)
    }
}

impl UnixProcess {
    pub fn new(kill_grace: Duration) -> Self {
        Self {
            running: None,
            pending: Vec::new(),
            kill_grace,
        }
    }

    fn spawn(&mut self, working_dir: &Path, line: &CommandLine) -> Result<Running, ProcessError> {
        let (reader, writer) = io::pipe().map_err(ProcessError::Pipe)?;
        let writer_err = writer.try_clone().map_err(ProcessError::Pipe)?;
        set_nonblocking(&reader).map_err(ProcessError::Pipe)?;

        let mut cmd = Command::new(&line.program);
        cmd.args(&line.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(writer))
            .stderr(Stdio::from(writer_err))
            .process_group(0);
        if !working_dir.as_os_str().is_empty() {
            cmd.current_dir(working_dir);
        }

        let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: line.program.clone(),
            source,
        })?;
        // The command still holds our copies of the write end; EOF on the
        // reader only arrives once they are closed.
        drop(cmd);

        // A process group leader's pgid is its pid.
        let pgid = Pid::from_raw(child.id() as i32);
        Ok(Running {
            pgid,
            reader: Some(reader),
        })
    }

    /// Pull the last output out of the pipe and forget the child.
    fn release(&mut self) {
        if let Some(mut running) = self.running.take() {
            if let Some(reader) = running.reader.as_mut() {
                if let Err(e) = read_available(reader, &mut self.pending, usize::MAX) {
                    debug!(error = %e, "final output read failed");
                }
            }
        }
    }

    /// Poll the group until it is reaped, escalating to SIGKILL once the
    /// grace period is over.
    fn reap(&self, pgid: Pid) -> Result<(), ProcessError> {
        let group = Pid::from_raw(-pgid.as_raw());
        let deadline = Instant::now() + self.kill_grace;
        loop {
            match waitpid(group, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) => return Ok(()),
                Ok(_) => {
                    if Instant::now() >= deadline {
                        warn!(pgid = pgid.as_raw(), "process group ignored SIGTERM; sending SIGKILL");
                        signal_group(pgid, Signal::SIGKILL)?;
                        return wait_blocking(group, pgid);
                    }
                    thread::sleep(REAP_POLL);
                }
                Err(Errno::EINTR) => continue,
                // Somebody else already reaped it.
                Err(Errno::ECHILD) => return Ok(()),
                Err(e) => return Err(wait_error(pgid, e)),
            }
        }
    }
}

impl ProcessControl for UnixProcess {
    fn start(&mut self, working_dir: &Path, command: &str) -> Result<(), ProcessError> {
        let line = CommandLine::parse(command).ok_or(ProcessError::EmptyCommand)?;
        if self.running.is_some() {
            self.terminate()?;
        }

        let running = self.spawn(working_dir, &line)?;
        info!(
            pid = running.pgid.as_raw(),
            cmd = %line,
            cwd = %working_dir.display(),
            "started process"
        );
        self.running = Some(running);
        Ok(())
    }

    fn poll_status(&mut self) -> Result<ProcessStatus, ProcessError> {
        let Some(pgid) = self.running.as_ref().map(|r| r.pgid) else {
            return Ok(ProcessStatus::NotRunning);
        };
        let group = Pid::from_raw(-pgid.as_raw());

        let mut retries = 0;
        let status = loop {
            match waitpid(group, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(_, 0)) => break ProcessStatus::DiedCorrectly,
                Ok(WaitStatus::Exited(_, code)) => {
                    debug!(pid = pgid.as_raw(), code, "process exited with error");
                    break ProcessStatus::DiedError;
                }
                Ok(WaitStatus::Signaled(_, signal, _)) => {
                    debug!(pid = pgid.as_raw(), ?signal, "process killed by signal");
                    break ProcessStatus::DiedKilled;
                }
                // Still alive, stopped or continued: not a death.
                Ok(_) => return Ok(ProcessStatus::StillAlive),
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => {
                    if retries == RACE_RETRIES {
                        return Err(ProcessError::RaceRetriesExhausted {
                            pid: pgid.as_raw().into(),
                            attempts: retries + 1,
                        });
                    }
                    retries += 1;
                    debug!(pid = pgid.as_raw(), retries, "no child yet; retrying");
                    thread::sleep(RACE_BACKOFF);
                }
                Err(e) => return Err(wait_error(pgid, e)),
            }
        };

        self.release();
        Ok(status)
    }

    fn terminate(&mut self) -> Result<(), ProcessError> {
        let Some(pgid) = self.running.as_ref().map(|r| r.pgid) else {
            return Ok(());
        };

        match killpg(pgid, Signal::SIGTERM) {
            Ok(()) => self.reap(pgid)?,
            // The whole group is gone, leader included.
            Err(Errno::ESRCH) => debug!(pgid = pgid.as_raw(), "process group already gone"),
            Err(e) => {
                return Err(ProcessError::Signal {
                    pid: pgid.as_raw().into(),
                    reason: e.desc().to_string(),
                });
            }
        }

        info!(pid = pgid.as_raw(), "terminated process");
        self.release();
        Ok(())
    }

    fn drain_output(&mut self, out: &mut Vec<u8>, timeout: Duration) -> Result<usize, ProcessError> {
        let mut appended = self.pending.len();
        out.append(&mut self.pending);

        let Some(running) = self.running.as_mut() else {
            return Ok(appended);
        };
        let Some(reader) = running.reader.as_mut() else {
            return Ok(appended);
        };

        if appended == 0 {
            let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
            let mut fds = [PollFd::new(reader.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::from(millis)) {
                Ok(0) | Err(Errno::EINTR) => return Ok(0),
                Ok(_) => {}
                Err(e) => return Err(ProcessError::Read(e.into())),
            }
        }

        let before = out.len();
        match read_available(reader, out, MAX_DRAIN_BYTES) {
            Ok(true) => {
                debug!(pid = running.pgid.as_raw(), "output pipe closed");
                running.reader = None;
            }
            Ok(false) => {}
            Err(e) => {
                running.reader = None;
                return Err(ProcessError::Read(e));
            }
        }
        appended += out.len() - before;
        Ok(appended)
    }

    fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn id(&self) -> Option<u32> {
        self.running.as_ref().map(|r| r.pgid.as_raw() as u32)
    }
}

impl Drop for UnixProcess {
    fn drop(&mut self) {
        if let Err(e) = self.terminate() {
            warn!(error = %e, "failed to terminate process on drop");
        }
    }
}

fn set_nonblocking(fd: &impl AsRawFd) -> io::Result<()> {
    let raw = fd.as_raw_fd();
    let flags = OFlag::from_bits_truncate(fcntl(raw, FcntlArg::F_GETFL)?);
    fcntl(raw, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
    Ok(())
}

/// Read until the pipe would block, hits EOF, or `limit` bytes were read.
/// Returns `true` on EOF.
fn read_available(reader: &mut PipeReader, out: &mut Vec<u8>, limit: usize) -> io::Result<bool> {
    let mut buf = [0u8; 4096];
    let mut total = 0usize;
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(true),
            Ok(n) => {
                out.extend_from_slice(&buf[..n]);
                total += n;
                if total >= limit {
                    return Ok(false);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

fn signal_group(pgid: Pid, signal: Signal) -> Result<(), ProcessError> {
    match killpg(pgid, signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(ProcessError::Signal {
            pid: pgid.as_raw().into(),
            reason: e.desc().to_string(),
        }),
    }
}

fn wait_blocking(group: Pid, pgid: Pid) -> Result<(), ProcessError> {
    loop {
        match waitpid(group, None) {
            Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) => return Ok(()),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => return Ok(()),
            Err(e) => return Err(wait_error(pgid, e)),
        }
    }
}

fn wait_error(pgid: Pid, errno: Errno) -> ProcessError {
    ProcessError::Wait {
        pid: pgid.as_raw().into(),
        reason: errno.desc().to_string(),
    }
}
