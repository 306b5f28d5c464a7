// src/proc/pid.rs

//! Signal-level process helpers.
//!
//! Used when a worker only has a persisted pid (e.g. a task externally marked
//! Terminated, or the daemon stopping a previous instance), not a live
//! [`super::ProcessHandle`].

use std::time::Duration;

use tracing::{debug, warn};

/// Interval between termination signals.
const SIGNAL_INTERVAL: Duration = Duration::from_millis(100);
/// After this long of polite signalling, escalate to SIGKILL.
const KILL_AFTER: Duration = Duration::from_secs(5);

/// True if a process with the given pid exists (signal-0 probe).
#[cfg(unix)]
pub fn pid_exists(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        // EPERM means the process exists but belongs to someone else.
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn pid_exists(_pid: u32) -> bool {
    false
}

/// Send one polite termination signal; errors are logged, not surfaced.
#[cfg(unix)]
pub fn send_terminate(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        debug!(pid, error = %e, "SIGTERM failed");
    }
}

#[cfg(not(unix))]
pub fn send_terminate(_pid: u32) {}

#[cfg(unix)]
fn send_kill(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!(pid, error = %e, "SIGKILL failed");
    }
}

#[cfg(not(unix))]
fn send_kill(_pid: u32) {}

/// Repeatedly signal a process until it disappears.
///
/// SIGTERM every 100 ms; escalates to SIGKILL once after five seconds so a
/// wedged recorder cannot hold the worker hostage.
pub async fn terminate_pid(pid: u32) {
    let started = tokio::time::Instant::now();
    let mut killed = false;

    while pid_exists(pid) {
        if !killed && started.elapsed() >= KILL_AFTER {
            warn!(pid, "process ignored SIGTERM; escalating to SIGKILL");
            send_kill(pid);
            killed = true;
        } else {
            send_terminate(pid);
        }
        tokio::time::sleep(SIGNAL_INTERVAL).await;
    }

    debug!(pid, "process gone");
}
