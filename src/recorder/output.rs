// src/recorder/output.rs

//! Placeholder media files.
//!
//! Output files are created empty before the tool runs so every downstream
//! consumer (resize task, schedule `file` hand-off, metadata queries) has a
//! path to point at from the start.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::Result;

/// Default container extension for recordings.
pub const DEFAULT_EXT: &str = "mp4";

/// Where output media lives under the configured base directory.
pub fn video_dir(base: &Path) -> PathBuf {
    base.join("videos")
}

/// Create an empty `<dir>/<stem>.<ext>` placeholder, creating `dir` first if
/// needed. An existing file of the same name is truncated.
pub fn create_placeholder(dir: &Path, stem: &str, ext: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{stem}.{ext}"));
    fs::File::create(&path)?;
    debug!(path = %path.display(), "created output placeholder");
    Ok(path)
}

/// Best-effort deletion (failed recordings leave no empty shells behind).
pub fn delete_file(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "could not delete output file");
        }
    }
}
