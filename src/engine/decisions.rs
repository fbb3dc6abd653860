// src/engine/decisions.rs

//! Pure decision logic for the supervisor core.
//!
//! Nothing here touches processes, the filesystem or the log. The core
//! calls these helpers and then carries out whatever they decided.

use crate::engine::{ControlIntent, WatchTask};

/// What the second half of a cycle should do, before any scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Supervision is off: make sure nothing is running.
    Stop,
    /// The watch path is known to be broken: pause supervision.
    PauseInvalid,
    /// Scan the watch path and maybe (re)start.
    Scan,
}

pub fn gate(task: &WatchTask) -> Gate {
    if !task.desired_running {
        Gate::Stop
    } else if task.folder_invalid {
        Gate::PauseInvalid
    } else {
        Gate::Scan
    }
}

/// Why a successful scan should (re)launch the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    None,
    /// The tree is newer than anything seen before. `baseline` is set for
    /// the first observation, which is not announced as a change.
    Changed { baseline: bool },
    /// Nothing changed, but a start was explicitly requested.
    Requested,
}

impl Trigger {
    pub fn fires(self) -> bool {
        !matches!(self, Trigger::None)
    }
}

pub fn scan_trigger(last_modified_time: u64, latest: u64, pending_start: bool) -> Trigger {
    if latest > last_modified_time {
        Trigger::Changed {
            baseline: last_modified_time == 0,
        }
    } else if pending_start {
        Trigger::Requested
    } else {
        Trigger::None
    }
}

/// The full launch rule for one cycle: desired, valid, scanned, and either
/// newer than the last observation or explicitly requested.
pub fn should_launch(task: &WatchTask, scanned: Option<u64>) -> bool {
    match (gate(task), scanned) {
        (Gate::Scan, Some(latest)) => {
            scan_trigger(task.last_modified_time, latest, task.pending_start).fires()
        }
        _ => false,
    }
}

/// Side effects an intent needs beyond editing the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentEffect {
    None,
    /// The watch path changed; the scanner's reported-path memory is reset.
    WatchPathChanged,
    RestartNow,
    ReportStatus,
    Shutdown,
}

/// Apply `intent` to `task`. `running` says whether a child is alive.
pub fn apply_intent(task: &mut WatchTask, intent: ControlIntent, running: bool) -> IntentEffect {
    match intent {
        ControlIntent::SetWatchPath(path) => {
            task.watch_directory = path;
            task.folder_invalid = false;
            task.last_modified_time = 0;
            IntentEffect::WatchPathChanged
        }
        ControlIntent::SetCommand(command) => {
            task.command = command;
            IntentEffect::None
        }
        ControlIntent::SetWorkingDirectory(dir) => {
            task.working_directory = dir;
            IntentEffect::None
        }
        ControlIntent::SetRunning(on) => {
            set_running(task, on);
            IntentEffect::None
        }
        ControlIntent::ToggleRunning => {
            let on = !task.desired_running;
            set_running(task, on);
            IntentEffect::None
        }
        ControlIntent::Restart if running => IntentEffect::RestartNow,
        ControlIntent::Restart => {
            set_running(task, true);
            task.pending_start = true;
            IntentEffect::None
        }
        ControlIntent::Status => IntentEffect::ReportStatus,
        ControlIntent::Shutdown => IntentEffect::Shutdown,
    }
}

fn set_running(task: &mut WatchTask, on: bool) {
    if on && !task.desired_running {
        task.pending_start = true;
        task.folder_invalid = false;
    }
    if !on {
        task.pending_start = false;
    }
    task.desired_running = on;
}
