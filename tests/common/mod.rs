#![allow(dead_code)]

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

pub use rerun_test_utils::init_tracing;

use rerun::engine::{Supervisor, SupervisorOptions, WatchTask};
use rerun::fs::mock::MockFileSystem;
use rerun_test_utils::FakeProcess;

/// A supervisor over an in-memory tree and a fake process.
pub fn fake_supervisor(
    fs: &MockFileSystem,
    process: &FakeProcess,
    task: WatchTask,
) -> Supervisor<FakeProcess, MockFileSystem> {
    let options = SupervisorOptions {
        log_capacity: 64,
        drain_timeout: Duration::ZERO,
    };
    Supervisor::new(task, process.clone(), fs.clone(), options).expect("valid supervisor")
}

/// Count log lines containing `needle`.
pub fn log_count<P, F>(sup: &Supervisor<P, F>, needle: &str) -> usize
where
    P: rerun::process::ProcessControl,
    F: rerun::fs::FileSystem,
{
    sup.log().iter().filter(|l| l.text.contains(needle)).count()
}

/// Write `path` and set its mtime to `secs` seconds after the epoch.
pub fn write_with_mtime(path: &Path, secs: u64) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, b"x")?;
    set_mtime(path, secs)
}

pub fn set_mtime(path: &Path, secs: u64) -> io::Result<()> {
    let time = SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
    File::options().write(true).open(path)?.set_modified(time)
}

/// Poll `f` every 10 ms until it returns `Some`, or give up after `limit`.
pub fn wait_for<T>(limit: Duration, mut f: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(v) = f() {
            return Some(v);
        }
        if Instant::now() >= deadline {
            return None;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}
