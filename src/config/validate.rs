// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{RecorderError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RecorderError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.storage,
            raw.daemon,
            raw.recorder,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_storage(cfg)?;
    validate_timing(cfg)?;
    Ok(())
}

fn validate_storage(cfg: &RawConfigFile) -> Result<()> {
    if cfg.storage.base_dir.as_os_str().is_empty() {
        return Err(RecorderError::Config(
            "[storage].base_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_timing(cfg: &RawConfigFile) -> Result<()> {
    if cfg.daemon.wait == 0 {
        return Err(RecorderError::Config(
            "[daemon].wait must be >= 1 second (got 0)".to_string(),
        ));
    }

    // A due queue must be seen by at least one poll tick before the timer
    // overshoot sweep would claim it.
    if cfg.daemon.wait >= cfg.daemon.threshold {
        return Err(RecorderError::Config(format!(
            "[daemon].wait ({}) must be lower than [daemon].threshold ({})",
            cfg.daemon.wait, cfg.daemon.threshold
        )));
    }

    if cfg.recorder.tick == 0 {
        return Err(RecorderError::Config(
            "[recorder].tick must be >= 1 second (got 0)".to_string(),
        ));
    }

    Ok(())
}
