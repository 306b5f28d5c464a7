// src/proc/supervisor.rs

//! One spawned external process: shell invocation, line-buffered stdio
//! capture, non-blocking liveness polling, polite and forceful termination.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::{RecorderError, Result};
use crate::proc::pid::send_terminate;

/// Grace period between SIGTERM and SIGKILL in [`ProcessHandle::stop`].
const STOP_GRACE: Duration = Duration::from_millis(500);

/// Non-blocking liveness snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poll {
    pub running: bool,
    pub exit_code: Option<i32>,
}

/// Handle around one spawned OS process.
///
/// The handle exclusively owns the process stdio: reader tasks pump each
/// stream line-by-line into channels, so callers can take lines without
/// blocking while the process runs and drain the remainder after it exits.
/// Dropping the handle kills the process (`kill_on_drop`).
pub struct ProcessHandle {
    child: tokio::process::Child,
    pid: u32,
    stdout: mpsc::UnboundedReceiver<String>,
    stderr: mpsc::UnboundedReceiver<String>,
    exit_code: Option<i32>,
}

impl ProcessHandle {
    /// Spawn `command` through the platform shell with piped stdio.
    pub fn spawn(command: &str) -> Result<Self> {
        debug!(cmd = %command, "spawning process");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        };

        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(RecorderError::Spawn)?;

        let pid = child.id().ok_or_else(|| {
            RecorderError::Spawn(std::io::Error::other("process exited before pid was read"))
        })?;

        let stdout = pump_lines(child.stdout.take());
        let stderr = pump_lines(child.stderr.take());

        Ok(Self {
            child,
            pid,
            stdout,
            stderr,
            exit_code: None,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Non-blocking liveness check; the exit code is cached once observed.
    pub fn poll(&mut self) -> Poll {
        if self.exit_code.is_none() {
            match self.child.try_wait() {
                Ok(Some(status)) => self.exit_code = Some(status.code().unwrap_or(-1)),
                Ok(None) => {}
                Err(e) => warn!(pid = self.pid, error = %e, "try_wait failed"),
            }
        }
        Poll {
            running: self.exit_code.is_none(),
            exit_code: self.exit_code,
        }
    }

    /// Take at most one buffered stdout line; never blocks.
    pub fn read_stdout_line(&mut self) -> Option<String> {
        self.stdout.try_recv().ok()
    }

    /// Take at most one buffered stderr line; never blocks.
    pub fn read_stderr_line(&mut self) -> Option<String> {
        self.stderr.try_recv().ok()
    }

    /// Collect all remaining stdout.
    ///
    /// Completes when the reader task finishes, i.e. once the process has
    /// closed its stream — call after the process exited.
    pub async fn drain_stdout(&mut self) -> String {
        drain(&mut self.stdout).await
    }

    /// Collect all remaining stderr. Same caveat as [`Self::drain_stdout`].
    pub async fn drain_stderr(&mut self) -> String {
        drain(&mut self.stderr).await
    }

    /// Polite shutdown signal (SIGTERM); failures are logged, not surfaced.
    pub fn terminate(&self) {
        send_terminate(self.pid);
    }

    /// Forceful termination (SIGKILL) and reap.
    pub async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            warn!(pid = self.pid, error = %e, "kill failed");
        }
        self.poll();
    }

    /// Polite stop: SIGTERM, half-second grace, then SIGKILL if still alive.
    pub async fn stop(&mut self) {
        self.terminate();
        if self.wait(STOP_GRACE).await.is_none() {
            debug!(pid = self.pid, "process survived SIGTERM; killing");
            self.kill().await;
        }
    }

    /// Wait for exit up to `timeout`; returns the exit code if it exited.
    pub async fn wait(&mut self, timeout: Duration) -> Option<i32> {
        if let Some(code) = self.exit_code {
            return Some(code);
        }
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.exit_code = Some(status.code().unwrap_or(-1));
                self.exit_code
            }
            Ok(Err(e)) => {
                warn!(pid = self.pid, error = %e, "wait failed");
                None
            }
            Err(_) => None,
        }
    }
}

/// Spawn a reader task pumping one stream into an unbounded line channel.
///
/// Read errors end the pump; the receiver then simply sees end-of-stream,
/// which matches how the rest of the system treats stdio (best effort).
fn pump_lines<R>(stream: Option<R>) -> mpsc::UnboundedReceiver<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    if let Some(stream) = stream {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    }

    rx
}

async fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    let mut out = String::new();
    while let Some(line) = rx.recv().await {
        out.push_str(&line);
        out.push('\n');
    }
    out
}
