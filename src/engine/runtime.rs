// src/engine/runtime.rs

//! Async shell around the synchronous [`Supervisor`].
//!
//! [`Runtime::run`] owns the loop: it checks for shutdown, applies queued
//! [`ControlIntent`]s, runs one cycle, hands the result to a [`Frontend`],
//! then sleeps for the poll interval. The sleep ends early when the
//! shutdown flag flips. On exit the live process is terminated and the
//! frontend renders one last time.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::log_buffer::LogBuffer;
use crate::process::ProcessControl;

use super::core::Supervisor;
use super::{ControlIntent, CycleReport};

/// Something that shows the supervisor's state to a human.
///
/// Called once per cycle, after the core has run. Implementations must only
/// read; they get no mutable access to the supervisor.
pub trait Frontend {
    fn render(&mut self, log: &LogBuffer, report: &CycleReport);
}

/// Prints every new log line to a writer (stdout in production).
pub struct HeadlessFrontend<W: Write> {
    out: W,
    next_seq: u64,
}

impl<W: Write> HeadlessFrontend<W> {
    pub fn new(out: W) -> Self {
        Self { out, next_seq: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Frontend for HeadlessFrontend<W> {
    fn render(&mut self, log: &LogBuffer, _report: &CycleReport) {
        let lines = log.lines_since(self.next_seq);
        if let Some(first) = lines.first() {
            if first.seq > self.next_seq {
                debug!(missed = first.seq - self.next_seq, "log lines evicted before render");
            }
        }
        for line in &lines {
            if let Err(e) = writeln!(self.out, "{line}") {
                warn!(error = %e, "failed to write log line");
                break;
            }
        }
        if let Err(e) = self.out.flush() {
            debug!(error = %e, "failed to flush frontend output");
        }
        self.next_seq = log.next_seq();
    }
}

/// Paces the supervisor core and connects it to the outside world.
///
/// This is a pure IO shell around [`Supervisor`], which contains all the
/// supervision semantics. This struct handles the async side: sleeping
/// between cycles, receiving control intents and reacting to shutdown.
pub struct Runtime<P: ProcessControl, F: FileSystem, R: Frontend> {
    supervisor: Supervisor<P, F>,
    intent_rx: mpsc::Receiver<ControlIntent>,
    shutdown_rx: watch::Receiver<bool>,
    frontend: R,
    poll_interval: Duration,
}

impl<P: ProcessControl, F: FileSystem, R: Frontend> fmt::Debug for Runtime<P, F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("task", self.supervisor.task())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl<P: ProcessControl, F: FileSystem, R: Frontend> Runtime<P, F, R> {
    pub fn new(
        supervisor: Supervisor<P, F>,
        intent_rx: mpsc::Receiver<ControlIntent>,
        shutdown_rx: watch::Receiver<bool>,
        frontend: R,
        poll_interval: Duration,
    ) -> Self {
        Self {
            supervisor,
            intent_rx,
            shutdown_rx,
            frontend,
            poll_interval,
        }
    }

    /// Main loop.
    ///
    /// - Checks the shutdown flag at the start of every cycle.
    /// - Applies queued control intents.
    /// - Runs one core cycle and renders the result.
    /// - Sleeps for the poll interval, waking early on shutdown.
    ///
    /// Returns the supervisor so callers can inspect its final state. A fatal
    /// error ends the loop immediately; dropping the supervisor then still
    /// terminates the child.
    pub async fn run(mut self) -> Result<Supervisor<P, F>> {
        info!(
            watch = %self.supervisor.task().watch_directory.display(),
            cmd = %self.supervisor.task().command,
            "rerun supervisor started"
        );
        let mut shutdown_open = true;

        loop {
            if *self.shutdown_rx.borrow_and_update() {
                info!("shutdown requested");
                break;
            }

            if !self.apply_intents()? {
                info!("exit requested from console");
                break;
            }

            let report = self.supervisor.cycle()?;
            if !report.actions.is_empty() {
                debug!(?report, "cycle complete");
            }
            self.frontend.render(self.supervisor.log(), &report);

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = self.shutdown_rx.changed(), if shutdown_open => {
                    if changed.is_err() {
                        debug!("shutdown sender dropped; relying on intents only");
                        shutdown_open = false;
                    }
                }
            }
        }

        self.supervisor.shutdown()?;
        let report = CycleReport {
            status: self.supervisor.status(),
            ..CycleReport::default()
        };
        self.frontend.render(self.supervisor.log(), &report);
        info!("runtime exiting");
        Ok(self.supervisor)
    }

    /// Returns `false` if one of the intents asked the loop to end.
    fn apply_intents(&mut self) -> Result<bool> {
        while let Ok(intent) = self.intent_rx.try_recv() {
            if !self.supervisor.apply(intent)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
