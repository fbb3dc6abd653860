#![allow(dead_code)]

use rerun::config::{RawConfigFile, Settings};

/// Builder for `Settings` to simplify test setup.
///
/// Starts from the same defaults as an empty config file, with a fast poll
/// interval and a short kill grace so tests do not wait on production timings.
pub struct SettingsBuilder {
    raw: RawConfigFile,
}

impl SettingsBuilder {
    pub fn new(command: &str) -> Self {
        let mut raw = RawConfigFile::default();
        raw.process.command = Some(command.to_string());
        raw.process.kill_grace_ms = 500;
        raw.supervisor.poll_interval_ms = 10;
        raw.supervisor.drain_timeout_ms = 1;
        Self { raw }
    }

    pub fn watch(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.raw.watch.path = path.into();
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.raw.watch.exclude.push(pattern.to_string());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.raw.process.working_dir = Some(dir.into());
        self
    }

    pub fn paused(mut self) -> Self {
        self.raw.process.autostart = false;
        self
    }

    pub fn log_capacity(mut self, n: usize) -> Self {
        self.raw.supervisor.log_capacity = n;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.raw.supervisor.poll_interval_ms = ms;
        self
    }

    pub fn kill_grace_ms(mut self, ms: u64) -> Self {
        self.raw.process.kill_grace_ms = ms;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.raw
    }

    pub fn build(self) -> Settings {
        Settings::try_from(self.raw).expect("Failed to build valid settings from builder")
    }
}
