// src/config/loader.rs

//! Config file loading.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

const CONFIG_ENV: &str = "STREAMREC_CONFIG";

/// Read, parse and validate a config file.
///
/// The TOML layer fills per-section defaults; the `TryFrom` conversion in
/// `validate` enforces the cross-field rules (timing sanity, non-empty base
/// dir). A missing file is an error here — callers that treat the config as
/// optional go through [`load_or_default`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw: RawConfigFile = toml::from_str(&fs::read_to_string(path)?)?;
    debug!(path = %path.display(), "configuration loaded");
    raw.try_into()
}

/// Like [`load_and_validate`], but a missing file yields the built-in
/// defaults — running without a `Streamrec.toml` is fine.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(ConfigFile::default());
    }
    load_and_validate(path)
}

/// Resolve the default config path: `STREAMREC_CONFIG` when set, otherwise
/// `Streamrec.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("Streamrec.toml"))
}
