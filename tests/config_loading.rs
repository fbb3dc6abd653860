// tests/config_loading.rs

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use rerun::cli::CliArgs;
use rerun::config::{load_and_validate, load_from_path};
use rerun::errors::RerunError;
use rerun::resolve_settings;
use rerun_test_utils::SettingsBuilder;

type TestResult = Result<(), Box<dyn Error>>;

const FULL: &str = r#"
[watch]
path = "./src"
exclude = ["**/*.swp", "target"]

[process]
command = "cargo run --release"
working_dir = "app"
autostart = false
kill_grace_ms = 1500

[supervisor]
poll_interval_ms = 100
log_capacity = 32
drain_timeout_ms = 5
"#;

#[test]
fn full_file_is_loaded_and_validated() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Rerun.toml");
    fs::write(&path, FULL)?;

    let settings = load_and_validate(&path)?;
    assert_eq!(settings.watch_path, PathBuf::from("./src"));
    assert_eq!(settings.exclude, vec!["**/*.swp", "target"]);
    assert_eq!(settings.command, "cargo run --release");
    assert_eq!(settings.working_dir, PathBuf::from("app"));
    assert!(!settings.autostart);
    assert_eq!(settings.kill_grace, Duration::from_millis(1500));
    assert_eq!(settings.poll_interval, Duration::from_millis(100));
    assert_eq!(settings.log_capacity, 32);
    assert_eq!(settings.drain_timeout, Duration::from_millis(5));

    let task = settings.watch_task();
    assert!(!task.desired_running);
    assert!(!task.pending_start);
    assert_eq!(task.last_modified_time, 0);
    Ok(())
}

#[test]
fn wrong_types_are_toml_errors() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[supervisor]\npoll_interval_ms = \"fast\"\n")?;

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, RerunError::TomlError(_)));
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_from_path("/definitely/not/here/Rerun.toml").unwrap_err();
    assert!(matches!(err, RerunError::IoError(_)));
}

#[test]
fn file_without_command_needs_the_cli() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Rerun.toml");
    fs::write(&path, "[watch]\npath = \"lib\"\n")?;

    assert!(matches!(
        load_and_validate(&path).unwrap_err(),
        RerunError::ConfigError(_)
    ));

    let config = path.to_str().ok_or("utf-8 path")?;
    let args = CliArgs::try_parse_from(["rerun", "--config", config, "-d", "run", "--", "make", "serve"])?;
    let settings = resolve_settings(&args)?;
    assert_eq!(settings.command, "make serve");
    assert_eq!(settings.watch_path, PathBuf::from("lib"));
    assert_eq!(settings.working_dir, PathBuf::from("run"));
    Ok(())
}

#[test]
fn cli_flags_win_over_the_file() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Rerun.toml");
    fs::write(&path, FULL)?;
    let config = path.to_str().ok_or("utf-8 path")?;

    let args = CliArgs::try_parse_from([
        "rerun",
        "--config",
        config,
        "--watch",
        "tests",
        "--interval-ms",
        "20",
        "--log-capacity",
        "8",
        "--exclude",
        "*.tmp",
    ])?;
    let settings = resolve_settings(&args)?;
    assert_eq!(settings.watch_path, PathBuf::from("tests"));
    assert_eq!(settings.poll_interval, Duration::from_millis(20));
    assert_eq!(settings.log_capacity, 8);
    assert_eq!(settings.exclude, vec!["**/*.swp", "target", "*.tmp"]);
    assert_eq!(settings.command, "cargo run --release");
    Ok(())
}

#[test]
fn builder_produces_fast_test_settings() {
    let settings = SettingsBuilder::new("sleep 1").watch("w").paused().build();
    assert_eq!(settings.poll_interval, Duration::from_millis(10));
    assert!(!settings.autostart);
    assert_eq!(settings.watch_task().watch_directory, PathBuf::from("w"));
}
