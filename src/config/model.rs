// src/config/model.rs

//! Configuration file model.
//!
//! ```toml
//! [storage]
//! base_dir = "/var/lib/streamrec"
//!
//! [daemon]
//! wait = 2
//! threshold = 4
//!
//! [recorder]
//! tick = 5
//! overextend = 10
//! ```
//!
//! All sections are optional and have defaults. `RawConfigFile` is the direct
//! TOML mapping; `ConfigFile` is the validated form the rest of the
//! application consumes (see `validate`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::daemon::DaemonConfig;
use crate::recorder::SupervisorConfig;

/// `[storage]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    /// Lock files and the `videos/` directory live under here.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

/// `[daemon]` section. Seconds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DaemonSection {
    /// Sleep between poll ticks. Must stay below `threshold`.
    #[serde(default = "default_wait")]
    pub wait: u64,

    /// How far past its timer a Created queue may be before it times out.
    #[serde(default = "default_threshold")]
    pub threshold: u64,
}

fn default_wait() -> u64 {
    2
}

fn default_threshold() -> u64 {
    4
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            wait: default_wait(),
            threshold: default_threshold(),
        }
    }
}

/// `[recorder]` section. Seconds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RecorderSection {
    /// Supervisor observation loop tick.
    #[serde(default = "default_tick")]
    pub tick: u64,

    /// Grace past the scheduled end before the recording is force-stopped.
    #[serde(default = "default_overextend")]
    pub overextend: u64,
}

fn default_tick() -> u64 {
    5
}

fn default_overextend() -> u64 {
    10
}

impl Default for RecorderSection {
    fn default() -> Self {
        Self {
            tick: default_tick(),
            overextend: default_overextend(),
        }
    }
}

/// Direct TOML mapping, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub daemon: DaemonSection,
    #[serde(default)]
    pub recorder: RecorderSection,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    storage: StorageSection,
    daemon: DaemonSection,
    recorder: RecorderSection,
}

impl ConfigFile {
    /// Construct without re-validating; only `validate` calls this.
    pub(crate) fn new_unchecked(
        storage: StorageSection,
        daemon: DaemonSection,
        recorder: RecorderSection,
    ) -> Self {
        Self {
            storage,
            daemon,
            recorder,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.storage.base_dir
    }

    pub fn video_dir(&self) -> PathBuf {
        crate::recorder::output::video_dir(&self.storage.base_dir)
    }

    pub fn daemon_config(&self) -> DaemonConfig {
        DaemonConfig {
            wait: Duration::from_secs(self.daemon.wait),
            threshold: Duration::from_secs(self.daemon.threshold),
        }
    }

    /// Supervisor settings; `wait_for_start_time` stays with the caller.
    pub fn supervisor_config(&self, wait_for_start_time: bool) -> SupervisorConfig {
        SupervisorConfig {
            wait_for_start_time,
            tick: Duration::from_secs(self.recorder.tick),
            overextend: Duration::from_secs(self.recorder.overextend),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(
            StorageSection::default(),
            DaemonSection::default(),
            RecorderSection::default(),
        )
    }
}
