// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod log_buffer;
pub mod logging;
pub mod process;
pub mod types;
pub mod watch;

use std::io;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{RawConfigFile, Settings, default_config_path, load_from_path};
use crate::engine::console::spawn_console;
use crate::engine::{HeadlessFrontend, Runtime, Supervisor};
use crate::fs::RealFileSystem;
use crate::process::ProcessHandle;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the supervisor core with the real process handle and filesystem
/// - the stdin console
/// - Ctrl-C / SIGTERM handling
pub async fn run(args: CliArgs) -> Result<()> {
    let settings = resolve_settings(&args)?;
    info!(
        watch = %settings.watch_path.display(),
        cmd = %settings.command,
        interval_ms = settings.poll_interval.as_millis() as u64,
        "configuration loaded"
    );

    let process = ProcessHandle::new(settings.kill_grace);
    let supervisor = Supervisor::new(
        settings.watch_task(),
        process,
        RealFileSystem,
        settings.supervisor_options(),
    )?;

    let (intent_tx, intent_rx) = mpsc::channel(32);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    tokio::spawn(async move {
        if wait_for_signal().await {
            let _ = shutdown_tx.send(true);
        }
    });

    if let Err(e) = spawn_console(intent_tx) {
        warn!(error = %e, "failed to start console; running without it");
    }

    let runtime = Runtime::new(
        supervisor,
        intent_rx,
        shutdown_rx,
        HeadlessFrontend::new(io::stdout()),
        settings.poll_interval,
    );
    runtime.run().await?;
    Ok(())
}

/// Load the config file (explicit, or the default one if it exists), then
/// apply command-line overrides and validate.
pub fn resolve_settings(args: &CliArgs) -> Result<Settings> {
    let mut raw = match &args.config {
        Some(path) => load_from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => {
            let path = default_config_path();
            if path.is_file() {
                debug!(path = %path.display(), "using default config file");
                load_from_path(&path)
                    .with_context(|| format!("loading config {}", path.display()))?
            } else {
                RawConfigFile::default()
            }
        }
    };

    args.apply_to(&mut raw);
    Ok(Settings::try_from(raw)?)
}

/// Resolves to `true` once Ctrl-C (or SIGTERM on Unix) arrives, or to
/// `false` if no listener could be installed.
#[cfg(unix)]
async fn wait_for_signal() -> bool {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "failed to listen for SIGTERM");
            return ctrl_c().await;
        }
    };

    tokio::select! {
        got = ctrl_c() => got,
        _ = term.recv() => {
            debug!("received SIGTERM");
            true
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> bool {
    ctrl_c().await
}

async fn ctrl_c() -> bool {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            debug!("received Ctrl+C");
            true
        }
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl+C");
            false
        }
    }
}
