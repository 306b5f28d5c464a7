// src/config/mod.rs

//! Configuration: TOML file model, loading and validation.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_or_default};
pub use model::{ConfigFile, DaemonSection, RawConfigFile, RecorderSection, StorageSection};
