// src/daemon/mod.rs

//! The singleton background loop.
//!
//! Every `wait` seconds the daemon reconciles Processing queues with their
//! tasks, sweeps overdue Created queues into Timeout, and dispatches due
//! queues onto worker tasks. Mutual exclusion and external stop go through
//! the [`lockfiles`] pair — the store is the only other shared state.

pub mod lockfiles;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::{calculate_queue_status, start_queue};
use crate::errors::{RecorderError, Result};
use crate::model::{Id, QueueStatus, ScheduleStatus};
use crate::store::Store;

pub use lockfiles::Lockfiles;

/// Liveness log interval.
const LIVENESS_EVERY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct DaemonConfig {
    /// Sleep between poll ticks.
    pub wait: Duration,
    /// How far past its timer a Created queue may be before it times out.
    /// Must stay above `wait` or due queues get swept before dispatch.
    pub threshold: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(2),
            threshold: Duration::from_secs(4),
        }
    }
}

pub struct Daemon {
    store: Arc<dyn Store>,
    lockfiles: Lockfiles,
    config: DaemonConfig,
    workers: Vec<(Id, JoinHandle<()>)>,
    dispatched: HashSet<Id>,
}

impl Daemon {
    pub fn new(store: Arc<dyn Store>, base_dir: &Path, config: DaemonConfig) -> Self {
        Self {
            store,
            lockfiles: Lockfiles::new(base_dir),
            config,
            workers: Vec::new(),
            dispatched: HashSet::new(),
        }
    }

    pub fn lockfiles(&self) -> &Lockfiles {
        &self.lockfiles
    }

    pub fn is_running(&self) -> bool {
        self.lockfiles.is_running()
    }

    /// Claim the singleton slot: fails with `DaemonRunning` when a pidfile is
    /// already present, otherwise writes pidfile + runfile.
    pub fn acquire(&self) -> Result<()> {
        if self.lockfiles.pidfile().exists() {
            warn!(pidfile = %self.lockfiles.pidfile().display(), "daemon already running");
            return Err(RecorderError::DaemonRunning);
        }
        self.lockfiles.write(std::process::id())?;
        Ok(())
    }

    /// Acquire the lock files and run the loop until stopped.
    pub async fn start(&mut self) -> Result<()> {
        self.acquire()?;
        info!(pid = std::process::id(), "daemon started");
        self.run().await
    }

    /// The poll loop; runs while the runfile exists.
    ///
    /// A loop-level failure removes the runfile and surfaces as a daemon
    /// error; a cooperative stop cleans up both lock files.
    pub async fn run(&mut self) -> Result<()> {
        match self.run_loop().await {
            Ok(()) => {
                if !self.workers.is_empty() {
                    warn!(workers = self.workers.len(), "exiting with workers still running");
                }
                self.lockfiles.remove_pidfile();
                self.lockfiles.remove_runfile();
                info!("daemon exiting");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "daemon loop failed");
                self.lockfiles.remove_runfile();
                Err(RecorderError::Daemon(e.to_string()))
            }
        }
    }

    async fn run_loop(&mut self) -> Result<()> {
        let mut last_liveness = tokio::time::Instant::now();

        while self.lockfiles.is_running() {
            self.reconcile_processing()?;
            self.dispatch_created()?;
            self.prune_workers();

            if last_liveness.elapsed() >= LIVENESS_EVERY {
                debug!(
                    workers = self.workers.len(),
                    dispatched = self.dispatched.len(),
                    "daemon alive"
                );
                last_liveness = tokio::time::Instant::now();
            }

            tokio::time::sleep(self.config.wait).await;
        }

        Ok(())
    }

    /// Re-derive every Processing queue's status from its tasks, so worker
    /// completions and failures are observed within one tick.
    fn reconcile_processing(&self) -> Result<()> {
        for queue in self.store.queues_with_status(QueueStatus::Processing) {
            match calculate_queue_status(self.store.as_ref(), queue.id) {
                Ok(_) => {}
                // The row can disappear between the listing and the
                // recalculation (cascade delete); that is not a loop failure.
                Err(RecorderError::NotFound { .. }) => {
                    debug!(queue = queue.id, "queue vanished during reconciliation")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Sweep overdue Created queues into Timeout and dispatch due ones.
    fn dispatch_created(&mut self) -> Result<()> {
        let now = Utc::now();
        let threshold = chrono::Duration::from_std(self.config.threshold)
            .unwrap_or_else(|_| chrono::Duration::seconds(4));

        for queue in self.store.queues_with_status(QueueStatus::Created) {
            match timer_state(queue.timer, now, threshold) {
                TimerState::Overshot => {
                    warn!(queue = queue.id, timer = ?queue.timer, "queue timer overshot; marking Timeout");
                    self.store.set_queue_status(queue.id, QueueStatus::Timeout)?;
                    continue;
                }
                TimerState::Future => continue,
                TimerState::Due => {}
            }

            if self.dispatched.contains(&queue.id) {
                continue;
            }

            debug!(queue = queue.id, "dispatching queue to worker");
            let store = Arc::clone(&self.store);
            let id = queue.id;
            let handle = tokio::spawn(async move {
                if let Err(e) = start_queue(store.as_ref(), id).await {
                    error!(queue = id, error = %e, "queue worker failed");
                }
            });
            self.workers.push((id, handle));
            self.dispatched.insert(id);
        }
        Ok(())
    }

    fn prune_workers(&mut self) {
        self.workers.retain(|(id, handle)| {
            if handle.is_finished() {
                debug!(queue = id, "worker finished");
                false
            } else {
                true
            }
        });
    }

    /// Stop a running daemon from any process.
    ///
    /// Removes the runfile first (cooperative), then signals the recorded pid
    /// until it disappears, then removes the pidfile. The own-pid guard keeps
    /// an in-process stop from signalling ourselves.
    pub async fn stop(&self) -> Result<()> {
        if !self.lockfiles.pidfile().exists() {
            warn!("daemon not running; nothing to stop");
            return Err(RecorderError::DaemonNotRunning);
        }

        self.lockfiles.remove_runfile();

        if let Some(pid) = self.lockfiles.read_pid() {
            if pid != std::process::id() && crate::proc::pid::pid_exists(pid) {
                info!(pid, "signalling daemon to stop");
                crate::proc::pid::terminate_pid(pid).await;
            }
        }

        self.lockfiles.remove_pidfile();
        info!("daemon stopped");
        Ok(())
    }
}

/// Where a Created queue's timer stands relative to the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Unset or reached: dispatch now.
    Due,
    /// Still in the future: skip.
    Future,
    /// Strictly more than `threshold` past due: mark Timeout. A timer at
    /// exactly `now - threshold` is still Due.
    Overshot,
}

/// Pure dispatch decision for a queue timer.
pub fn timer_state(
    timer: Option<chrono::DateTime<Utc>>,
    now: chrono::DateTime<Utc>,
    threshold: chrono::Duration,
) -> TimerState {
    match timer {
        None => TimerState::Due,
        Some(timer) if timer < now - threshold => TimerState::Overshot,
        Some(timer) if timer > now => TimerState::Future,
        Some(_) => TimerState::Due,
    }
}

/// Sweep past-due Scheduled records into Timeout.
///
/// Returns the affected ids; with `dry_run` nothing is written.
pub fn sweep_schedule_timeouts(store: &dyn Store, dry_run: bool) -> Result<Vec<Id>> {
    let now = Utc::now();
    let mut swept = Vec::new();

    for schedule in store.schedules_with_status(ScheduleStatus::Scheduled) {
        if schedule.start_time < now {
            if !dry_run {
                store.set_schedule_status(schedule.id, ScheduleStatus::Timeout)?;
            }
            swept.push(schedule.id);
        }
    }

    if !swept.is_empty() {
        info!(count = swept.len(), dry_run, "past-due records swept to Timeout");
    }
    Ok(swept)
}
