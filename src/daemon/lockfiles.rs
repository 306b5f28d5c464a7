// src/daemon/lockfiles.rs

//! Runfile / pidfile management.
//!
//! Two files under the base directory coordinate the single daemon instance:
//! - `.daemon.lock` (runfile): presence means "keep running" — removing it is
//!   the cooperative stop signal any process can send;
//! - `.daemon.pid` (pidfile): one ASCII decimal pid, the mutual-exclusion
//!   marker against a second instance.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::Result;

const RUNFILE: &str = ".daemon.lock";
const PIDFILE: &str = ".daemon.pid";

#[derive(Debug, Clone)]
pub struct Lockfiles {
    runfile: PathBuf,
    pidfile: PathBuf,
}

impl Lockfiles {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            runfile: base_dir.join(RUNFILE),
            pidfile: base_dir.join(PIDFILE),
        }
    }

    pub fn runfile(&self) -> &Path {
        &self.runfile
    }

    pub fn pidfile(&self) -> &Path {
        &self.pidfile
    }

    /// The daemon keeps running while the runfile exists.
    pub fn is_running(&self) -> bool {
        self.runfile.exists()
    }

    /// The pid recorded by a running (or crashed) daemon, if any.
    pub fn read_pid(&self) -> Option<u32> {
        let raw = fs::read_to_string(&self.pidfile).ok()?;
        match raw.trim().parse() {
            Ok(pid) => Some(pid),
            Err(_) => {
                warn!(path = %self.pidfile.display(), content = %raw.trim(), "pidfile holds no pid");
                None
            }
        }
    }

    /// Write both files, creating the base directory if needed.
    pub fn write(&self, pid: u32) -> Result<()> {
        if let Some(parent) = self.pidfile.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.pidfile, format!("{pid}\n"))?;
        fs::write(&self.runfile, "")?;
        debug!(pid, runfile = %self.runfile.display(), "lock files written");
        Ok(())
    }

    /// Remove the runfile (cooperative stop request). Best effort.
    pub fn remove_runfile(&self) {
        remove(&self.runfile);
    }

    /// Remove the pidfile. Best effort.
    pub fn remove_pidfile(&self) {
        remove(&self.pidfile);
    }
}

fn remove(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "could not remove lock file");
        }
    }
}
