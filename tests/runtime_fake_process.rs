// tests/runtime_fake_process.rs

mod common;
use crate::common::{fake_supervisor, init_tracing};

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, sleep};

use rerun::engine::{ControlIntent, CycleReport, Frontend, Runtime, WatchTask};
use rerun::fs::mock::MockFileSystem;
use rerun::log_buffer::LogBuffer;
use rerun_test_utils::{FakeProcess, within};

type TestResult = Result<(), Box<dyn Error>>;

/// Records every line it is shown, plus how many times it rendered.
#[derive(Clone, Default)]
struct RecordingFrontend {
    lines: Arc<Mutex<Vec<String>>>,
    renders: Arc<Mutex<usize>>,
    next_seq: u64,
}

impl Frontend for RecordingFrontend {
    fn render(&mut self, log: &LogBuffer, _report: &CycleReport) {
        let mut lines = self.lines.lock().unwrap();
        for line in log.lines_since(self.next_seq) {
            lines.push(line.text);
        }
        self.next_seq = log.next_seq();
        *self.renders.lock().unwrap() += 1;
    }
}

#[tokio::test]
async fn shutdown_signal_stops_loop_and_process() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("w/a", 1);
    let process = FakeProcess::new();
    let sup = fake_supervisor(&fs, &process, WatchTask::new("w", "", "sleep 10", true));

    let (_intent_tx, intent_rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let frontend = RecordingFrontend::default();
    let lines = Arc::clone(&frontend.lines);

    let runtime = Runtime::new(sup, intent_rx, shutdown_rx, frontend, Duration::from_millis(5));

    let (result, _) = tokio::join!(within(Duration::from_secs(5), runtime.run()), async {
        sleep(Duration::from_millis(50)).await;
        let _ = shutdown_tx.send(true);
    });

    let sup = result?;
    assert!(!sup.is_running());
    assert_eq!(process.start_count(), 1);
    assert_eq!(process.terminate_count(), 1);

    let lines = lines.lock().unwrap();
    assert!(lines.iter().any(|l| l.starts_with("started")));
    assert!(lines.iter().any(|l| l.starts_with("stopped")), "final render shows the stop");
    Ok(())
}

#[tokio::test]
async fn intents_are_applied_between_cycles() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("w/a", 1);
    let process = FakeProcess::new();
    let sup = fake_supervisor(&fs, &process, WatchTask::new("w", "", "sleep 10", false));

    let (intent_tx, intent_rx) = mpsc::channel(8);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let frontend = RecordingFrontend::default();
    let renders = Arc::clone(&frontend.renders);

    let runtime = Runtime::new(sup, intent_rx, shutdown_rx, frontend, Duration::from_millis(5));

    let probe = process.clone();
    let (result, _) = tokio::join!(within(Duration::from_secs(5), runtime.run()), async {
        sleep(Duration::from_millis(30)).await;
        intent_tx.send(ControlIntent::SetRunning(true)).await.unwrap();
        while probe.start_count() == 0 {
            sleep(Duration::from_millis(5)).await;
        }
        intent_tx.send(ControlIntent::Shutdown).await.unwrap();
    });

    let sup = result?;
    assert_eq!(process.start_count(), 1);
    assert!(!sup.is_running());
    assert!(*renders.lock().unwrap() >= 2);
    Ok(())
}

#[tokio::test]
async fn fatal_error_is_returned_from_run() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("w/a", 1);
    let process = FakeProcess::new();
    process.fail_next_poll();
    let sup = fake_supervisor(&fs, &process, WatchTask::new("w", "", "sleep 10", true));

    let (_intent_tx, intent_rx) = mpsc::channel(8);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let runtime = Runtime::new(
        sup,
        intent_rx,
        shutdown_rx,
        RecordingFrontend::default(),
        Duration::from_millis(5),
    );

    let result = within(Duration::from_secs(5), runtime.run()).await;
    assert!(matches!(result, Err(rerun::errors::RerunError::Fatal(_))));
    Ok(())
}
