use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rerun::errors::ProcessError;
use rerun::process::{CommandLine, ProcessControl};
use rerun::types::ProcessStatus;

/// A call the supervisor made on the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessCall {
    Start { working_dir: PathBuf, command: String },
    Terminate,
}

#[derive(Debug, Default)]
struct FakeState {
    id: Option<u32>,
    next_id: u32,
    calls: Vec<ProcessCall>,
    /// Statuses to report on upcoming polls while running.
    script: VecDeque<ProcessStatus>,
    output: Vec<u8>,
    fail_next_start: bool,
    fail_next_poll: bool,
}

/// A process handle that never spawns anything.
///
/// - records every start/terminate
/// - reports `StillAlive` while "running" unless a death was scripted
/// - hands out queued output bytes on drain
///
/// Clones share state, so a test keeps one handle while the supervisor
/// owns the other.
#[derive(Debug, Clone, Default)]
pub struct FakeProcess {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProcess {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<ProcessCall> {
        self.lock().calls.clone()
    }

    pub fn start_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ProcessCall::Start { .. }))
            .count()
    }

    pub fn terminate_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ProcessCall::Terminate))
            .count()
    }

    /// The next poll while running reports `status` (a death).
    pub fn die_with(&self, status: ProcessStatus) {
        self.lock().script.push_back(status);
    }

    /// Output to hand out on the next drain.
    pub fn emit(&self, bytes: &[u8]) {
        self.lock().output.extend_from_slice(bytes);
    }

    /// Make the next `start` fail like a missing executable.
    pub fn fail_next_start(&self) {
        self.lock().fail_next_start = true;
    }

    /// Make the next poll fail with a fatal error.
    pub fn fail_next_poll(&self) {
        self.lock().fail_next_poll = true;
    }

    pub fn current_id(&self) -> Option<u32> {
        self.lock().id
    }
}

impl ProcessControl for FakeProcess {
    fn start(&mut self, working_dir: &Path, command: &str) -> Result<(), ProcessError> {
        let line = CommandLine::parse(command).ok_or(ProcessError::EmptyCommand)?;
        if self.lock().id.is_some() {
            self.terminate()?;
        }
        let mut state = self.lock();
        state.calls.push(ProcessCall::Start {
            working_dir: working_dir.to_path_buf(),
            command: command.to_string(),
        });
        if std::mem::take(&mut state.fail_next_start) {
            return Err(ProcessError::Spawn {
                program: line.program,
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        state.next_id += 1;
        state.id = Some(state.next_id);
        Ok(())
    }

    fn poll_status(&mut self) -> Result<ProcessStatus, ProcessError> {
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_next_poll) {
            return Err(ProcessError::RaceRetriesExhausted {
                pid: state.id.unwrap_or(0).into(),
                attempts: 4,
            });
        }
        if state.id.is_none() {
            return Ok(ProcessStatus::NotRunning);
        }
        match state.script.pop_front() {
            Some(status) if status.is_death() => {
                state.id = None;
                Ok(status)
            }
            Some(other) => Ok(other),
            None => Ok(ProcessStatus::StillAlive),
        }
    }

    fn terminate(&mut self) -> Result<(), ProcessError> {
        let mut state = self.lock();
        if state.id.take().is_some() {
            state.calls.push(ProcessCall::Terminate);
        }
        Ok(())
    }

    fn drain_output(&mut self, out: &mut Vec<u8>, _timeout: Duration) -> Result<usize, ProcessError> {
        let mut state = self.lock();
        let n = state.output.len();
        out.append(&mut state.output);
        Ok(n)
    }

    fn is_running(&self) -> bool {
        self.lock().id.is_some()
    }

    fn id(&self) -> Option<u32> {
        self.lock().id
    }
}
