// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{RawConfigFile, Settings};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw model.
///
/// This only performs TOML deserialization; it does **not** check that the
/// result is usable. Use [`load_and_validate`] for that, or validate after
/// merging command-line overrides.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it into [`Settings`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let raw_config = load_from_path(&path)?;
    let settings = Settings::try_from(raw_config)?;
    Ok(settings)
}

/// Config file picked up from the current directory when `--config` is not
/// given. Its absence is not an error.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Rerun.toml")
}
