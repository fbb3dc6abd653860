// src/watch/mod.rs

//! Change detection by polling.
//!
//! This module is responsible for:
//! - Walking the watch tree and reporting its latest modification time.
//! - Compiling `exclude` glob patterns that prune the walk.
//!
//! It does **not** decide whether to restart anything; it only turns the
//! state of the filesystem into a comparable timestamp.

pub mod path_utils;
pub mod patterns;
pub mod scanner;

pub use patterns::ExcludeSet;
pub use scanner::ChangeWatcher;
