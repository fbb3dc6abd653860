// src/engine/core.rs

//! Synchronous supervisor core.
//!
//! [`Supervisor`] owns the watch task, the log buffer, the process handle
//! and the change watcher. One call to [`Supervisor::cycle`] performs one
//! pass of the supervision loop:
//!
//! 1. poll the process and classify how it ended, if it did
//! 2. drain its output into the log, line by line
//! 3. stop the process if supervision is off
//! 4. otherwise scan the watch path and (re)start on a newer timestamp
//!
//! The core never sleeps between cycles and holds no Tokio types; pacing,
//! signals and rendering are the job of [`super::runtime::Runtime`]. It is
//! generic over [`ProcessControl`] and [`FileSystem`] so that tests can run
//! it entirely in memory.
//!
//! Only fatal process errors are returned as `Err`. Everything else is
//! written to the log and supervision carries on.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::decisions::{Gate, IntentEffect, Trigger, apply_intent, gate, scan_trigger};
use crate::engine::{ControlIntent, CycleAction, CycleReport, WatchTask};
use crate::errors::{ProcessError, RerunError, Result};
use crate::fs::FileSystem;
use crate::log_buffer::{DEFAULT_CAPACITY, LogBuffer};
use crate::process::{LineAssembler, ProcessControl};
use crate::types::ProcessStatus;
use crate::watch::{ChangeWatcher, ExcludeSet};

/// Knobs for the core that are not part of the watch task.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorOptions {
    pub log_capacity: usize,
    /// How long a drain may wait for the first byte of output.
    pub drain_timeout: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_CAPACITY,
            drain_timeout: Duration::from_millis(10),
        }
    }
}

#[derive(Debug)]
pub struct Supervisor<P: ProcessControl, F: FileSystem> {
    task: WatchTask,
    log: LogBuffer,
    process: P,
    watcher: ChangeWatcher<F>,
    assembler: LineAssembler,
    drain_timeout: Duration,
    scratch: Vec<u8>,
    /// Status seen by the previous poll.
    last_status: ProcessStatus,
    was_alive: bool,
}

impl<P: ProcessControl, F: FileSystem> Supervisor<P, F> {
    /// Build a supervisor, compiling the task's `exclude` patterns.
    pub fn new(task: WatchTask, process: P, fs: F, options: SupervisorOptions) -> Result<Self> {
        let exclude = ExcludeSet::new(&task.exclude)?;
        Ok(Self {
            task,
            log: LogBuffer::new(options.log_capacity),
            process,
            watcher: ChangeWatcher::new(fs, exclude),
            assembler: LineAssembler::new(),
            drain_timeout: options.drain_timeout,
            scratch: Vec::new(),
            last_status: ProcessStatus::NotRunning,
            was_alive: false,
        })
    }

    pub fn task(&self) -> &WatchTask {
        &self.task
    }

    pub fn log(&self) -> &LogBuffer {
        &self.log
    }

    pub fn process(&self) -> &P {
        &self.process
    }

    /// Status observed by the most recent cycle.
    pub fn status(&self) -> ProcessStatus {
        self.last_status
    }

    pub fn is_running(&self) -> bool {
        self.process.is_running()
    }

    /// Apply one control intent. Returns `false` when the loop should end.
    pub fn apply(&mut self, intent: ControlIntent) -> Result<bool> {
        debug!(?intent, "applying control intent");
        let running = self.process.is_running();
        match apply_intent(&mut self.task, intent, running) {
            IntentEffect::None => {}
            IntentEffect::WatchPathChanged => {
                self.watcher.forget_reported();
                self.log.log(format_args!(
                    "now watching {}",
                    self.task.watch_directory.display()
                ));
            }
            IntentEffect::RestartNow => {
                self.log.log(format_args!("restart requested"));
                self.launch()?;
            }
            IntentEffect::ReportStatus => self.report_status(),
            IntentEffect::Shutdown => return Ok(false),
        }
        Ok(true)
    }

    /// Run one supervision pass.
    pub fn cycle(&mut self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        let status = self.poll()?;
        report.status = status;
        report.output_lines = self.drain(status.is_death())?;
        self.observe(status, &mut report);

        match gate(&self.task) {
            Gate::Stop => {
                if self.process.is_running() {
                    self.stop()?;
                    report.actions.push(CycleAction::Stopped);
                }
            }
            Gate::PauseInvalid => {
                self.log.log(format_args!(
                    "watch path {} became invalid; supervision paused until it is changed",
                    self.task.watch_directory.display()
                ));
                warn!(path = %self.task.watch_directory.display(), "watch path invalid");
                self.task.desired_running = false;
                self.task.pending_start = false;
                report.actions.push(CycleAction::PausedInvalid);
            }
            Gate::Scan => self.scan_and_launch(&mut report)?,
        }

        Ok(report)
    }

    /// Terminate the child and keep its last output. Called once when the
    /// loop ends.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.process.is_running() {
            self.stop()?;
        }
        self.drain(true)?;
        Ok(())
    }

    fn poll(&mut self) -> Result<ProcessStatus> {
        let status = self.process.poll_status().map_err(RerunError::Fatal)?;
        self.last_status = status;
        Ok(status)
    }

    /// Log how the process ended, if it did.
    fn observe(&mut self, status: ProcessStatus, report: &mut CycleReport) {
        match status {
            ProcessStatus::DiedError => {
                self.log.log(format_args!(
                    "process exited with an error; not restarting until re-enabled"
                ));
                info!(cmd = %self.task.command, "process died with error; auto-stopping");
                self.task.desired_running = false;
                self.task.pending_start = false;
                report.actions.push(CycleAction::AutoStopped);
            }
            ProcessStatus::DiedKilled => {
                self.log.log(format_args!("process was killed by a signal"));
            }
            ProcessStatus::DiedCorrectly => {
                self.log.log(format_args!("process exited successfully"));
            }
            ProcessStatus::NotRunning if self.was_alive => {
                self.log.log(format_args!("process is not running"));
            }
            ProcessStatus::NotRunning | ProcessStatus::StillAlive => {}
        }
        self.was_alive = status.is_alive();
    }

    fn scan_and_launch(&mut self, report: &mut CycleReport) -> Result<()> {
        let latest = match self
            .watcher
            .latest_modified_time(&self.task.watch_directory, &mut self.log)
        {
            Ok(ts) => ts,
            Err(e) => {
                debug!(error = %e, "scan failed");
                self.task.folder_invalid = true;
                report.actions.push(CycleAction::FolderInvalid);
                return Ok(());
            }
        };
        report.scanned = Some(latest);

        let trigger = scan_trigger(self.task.last_modified_time, latest, self.task.pending_start);
        if let Trigger::Changed { baseline } = trigger {
            self.task.last_modified_time = latest;
            if !baseline {
                self.log.log(format_args!("file change detected"));
            }
        }
        if trigger.fires() {
            self.task.pending_start = false;
            let action = self.launch()?;
            report.actions.push(action);
        }
        Ok(())
    }

    /// Start the command, or restart it if it is running.
    fn launch(&mut self) -> Result<CycleAction> {
        let running = self.process.is_running();
        let result = if running {
            self.process
                .restart(&self.task.working_directory, &self.task.command)
        } else {
            self.process
                .start(&self.task.working_directory, &self.task.command)
        };

        match result {
            Ok(()) => {
                self.was_alive = true;
                self.last_status = ProcessStatus::StillAlive;
                let verb = if running { "restarted" } else { "started" };
                self.log.log(format_args!("{verb} `{}`", self.task.command));
                Ok(if running {
                    CycleAction::Restarted
                } else {
                    CycleAction::Started
                })
            }
            Err(e) if e.is_fatal() => Err(RerunError::Fatal(e)),
            Err(e) => {
                self.log
                    .log(format_args!("failed to start `{}`: {e}", self.task.command));
                warn!(label = e.as_label(), error = %e, "start failed; auto-stopping");
                self.task.desired_running = false;
                self.task.pending_start = false;
                self.was_alive = false;
                Ok(CycleAction::StartFailed)
            }
        }
    }

    fn stop(&mut self) -> Result<()> {
        self.process.terminate().map_err(RerunError::Fatal)?;
        self.was_alive = false;
        self.last_status = ProcessStatus::NotRunning;
        self.log.log(format_args!("stopped `{}`", self.task.command));
        Ok(())
    }

    /// Move available output into the log. Returns the number of lines added.
    fn drain(&mut self, flush: bool) -> Result<usize> {
        self.scratch.clear();
        if let Err(e) = self
            .process
            .drain_output(&mut self.scratch, self.drain_timeout)
        {
            self.note_process_error(e)?;
        }

        let log = &mut self.log;
        let mut lines = 0;
        self.assembler.feed(&self.scratch, |line| {
            log.push_child(line);
            lines += 1;
        });
        if flush {
            self.assembler.flush(|line| {
                log.push_child(line);
                lines += 1;
            });
        }
        Ok(lines)
    }

    fn note_process_error(&mut self, e: ProcessError) -> Result<()> {
        if e.is_fatal() {
            return Err(RerunError::Fatal(e));
        }
        self.log.log(format_args!("{e}"));
        warn!(label = e.as_label(), error = %e, "process error");
        Ok(())
    }

    fn report_status(&mut self) {
        let state = if self.task.desired_running {
            "enabled"
        } else {
            "disabled"
        };
        let pid = self
            .process
            .id()
            .map(|p| format!(" (pid {p})"))
            .unwrap_or_default();
        let invalid = if self.task.folder_invalid {
            ", watch path invalid"
        } else {
            ""
        };
        self.log.log(format_args!(
            "{state}: `{}` is {}{pid}; watching {}{invalid}",
            self.task.command,
            self.last_status,
            self.task.watch_directory.display(),
        ));
    }
}
