// src/recorder/supervisor.rs

//! Long-running supervisor for one scheduled recording.
//!
//! Beyond a plain task this waits for the scheduled start time, enforces the
//! duration overrun limit, and polls the persisted `terminate` flag so any
//! controller (CLI, admin UI) can cancel without addressing this worker.
//! Every status change is appended to the schedule's log under a timestamped
//! separator.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::model::{Id, ScheduleStatus};
use crate::proc::ProcessHandle;
use crate::recorder::command::CommandBuilder;
use crate::recorder::output;
use crate::store::Store;

/// Tick while waiting for the scheduled start time.
const WAIT_TICK: Duration = Duration::from_millis(500);
/// Upper bound on post-exit stderr draining.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    /// Busy-wait until `start_time` before spawning.
    pub wait_for_start_time: bool,
    /// Observation loop tick.
    pub tick: Duration,
    /// Grace past the scheduled end before the process is force-stopped.
    pub overextend: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            wait_for_start_time: false,
            tick: Duration::from_secs(5),
            overextend: Duration::from_secs(10),
        }
    }
}

/// Supervises one record from spawn to terminal status.
pub struct Supervisor {
    store: Arc<dyn Store>,
    commands: Arc<dyn CommandBuilder>,
    video_dir: PathBuf,
    record: Id,
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new(
        store: Arc<dyn Store>,
        commands: Arc<dyn CommandBuilder>,
        video_dir: PathBuf,
        record: Id,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            store,
            commands,
            video_dir,
            record,
            config,
        }
    }

    /// Drive the recording to a terminal status.
    pub async fn run(self) -> Result<()> {
        let id = self.record;
        let rcd = self.store.schedule(id)?;
        let channel = self.store.channel(rcd.channel)?;

        let stem = format!("rec-{id}-{}", rcd.start_time.format("%Y%m%d%H%M%S"));
        let outfile = output::create_placeholder(&self.video_dir, &stem, output::DEFAULT_EXT)?;

        let cmd = self.commands.record(&channel.url, &outfile, rcd.duration);
        self.add_log(&format!("Running command: {cmd}"))?;

        if self.config.wait_for_start_time {
            info!(record = id, start = %rcd.start_time, "waiting for start time");
            while rcd.start_time > Utc::now() {
                tokio::time::sleep(WAIT_TICK).await;
            }
        }

        self.add_log("Started")?;
        let mut ps = match ProcessHandle::spawn(&cmd) {
            Ok(ps) => ps,
            Err(e) => {
                error!(record = id, error = %e, "record process could not be spawned");
                self.add_log(&format!("Process could not be started: {e}"))?;
                self.store.set_schedule_status(id, ScheduleStatus::Error)?;
                output::delete_file(&outfile);
                return Err(e);
            }
        };

        self.store.set_schedule_pid(id, Some(ps.pid()))?;
        self.store.set_schedule_status(id, ScheduleStatus::Processing)?;
        self.add_log(&format!("Processing on pid: {}", ps.pid()))?;
        info!(record = id, pid = ps.pid(), "record started");

        let canceled = self.observe(&mut ps, rcd.end_time()).await?;
        if canceled {
            return Ok(());
        }

        match ps.poll().exit_code {
            Some(0) => {
                self.store.set_schedule_file(id, Some(outfile))?;
                self.store.set_schedule_status(id, ScheduleStatus::Completed)?;
                self.add_log("Completed")?;
                info!(record = id, "record completed");
            }
            code => {
                let msg = format!("Record failed, exit with {code:?}");
                error!(record = id, exit_code = ?code, "record failed");
                let stderr = tokio::time::timeout(DRAIN_TIMEOUT, ps.drain_stderr())
                    .await
                    .unwrap_or_default();
                output::delete_file(&outfile);
                self.store.set_schedule_status(id, ScheduleStatus::Error)?;
                self.add_log(&msg)?;
                if !stderr.is_empty() {
                    self.add_log(&stderr)?;
                }
            }
        }

        Ok(())
    }

    /// Poll the row and the clock until the process exits or must be stopped.
    /// Returns true when the record was canceled (terminate flag or overrun).
    async fn observe(&self, ps: &mut ProcessHandle, end_time: chrono::DateTime<Utc>) -> Result<bool> {
        let id = self.record;
        let overextend = chrono::Duration::from_std(self.config.overextend)
            .unwrap_or_else(|_| chrono::Duration::seconds(10));

        while ps.poll().running {
            let row = self.store.schedule(id)?;

            if row.terminate {
                warn!(record = id, "terminate requested; stopping record");
                ps.stop().await;
                self.store.set_schedule_status(id, ScheduleStatus::Canceled)?;
                self.add_log("Terminated")?;
                return Ok(true);
            }

            if Utc::now() + overextend > end_time {
                warn!(record = id, end = %end_time, "record length over extended; stopping");
                self.add_log("Record length over extended")?;
                ps.stop().await;
                self.store.set_schedule_status(id, ScheduleStatus::Canceled)?;
                self.add_log("Terminated")?;
                return Ok(true);
            }

            debug!(record = id, pid = ps.pid(), "record still running");
            tokio::time::sleep(self.config.tick).await;
        }

        Ok(false)
    }

    /// Append a log entry under a timestamped separator line.
    fn add_log(&self, msg: &str) -> Result<()> {
        let entry = format!(
            "{} {} {}\n{msg}",
            "-".repeat(10),
            Utc::now().format("%d/%m/%Y %H:%M:%S"),
            "-".repeat(10),
        );
        self.store.append_schedule_log(self.record, &entry)
    }
}
