// src/config/mod.rs

//! Configuration loading and validation for rerun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into [`Settings`], the only form the rest of the crate
//!   consumes (`validate.rs`).
//!
//! Command-line flags are merged into the raw model before validation, so a
//! config file may leave out anything the CLI provides.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ProcessSection, RawConfigFile, Settings, SupervisorSection, WatchSection};
