// src/engine/task.rs

//! One task's lifecycle: spawn, observe, finalise.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::errors::{RecorderError, Result};
use crate::model::{Id, TaskStatus};
use crate::proc::pid::{pid_exists, terminate_pid};
use crate::proc::ProcessHandle;
use crate::store::Store;

/// Observation loop tick.
const TICK: Duration = Duration::from_secs(1);
/// Re-read the persisted row every this many ticks (external terminate).
const REREAD_TICKS: u64 = 10;
/// Upper bound on post-exit stdio draining.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a task to completion.
///
/// Preconditions (typed failures, nothing persisted yet):
/// - [`RecorderError::Command`] — empty command;
/// - [`RecorderError::Dependence`] — dependency not Completed;
/// - [`RecorderError::Status`] — task not in Created.
///
/// Afterwards the task is Processing with a pid, the observation loop runs
/// until the process exits or is terminated, and the final status is written
/// together with `ended_at`. With `check` set, a final status of Error or
/// Terminated is surfaced as [`RecorderError::Process`].
pub async fn run_task(store: &dyn Store, id: Id, check: bool) -> Result<()> {
    let task = store.task(id)?;

    if task.command.trim().is_empty() {
        return Err(RecorderError::Command(id));
    }
    if let Some(dep_id) = task.depends_on {
        let dep = store.task(dep_id)?;
        if dep.status != TaskStatus::Completed {
            return Err(RecorderError::Dependence {
                task: id,
                depends_on: dep_id,
                status: dep.status,
            });
        }
    }
    if task.status != TaskStatus::Created {
        return Err(RecorderError::Status(format!(
            "task {id} is {:?}; only Created tasks can run (clear it first)",
            task.status
        )));
    }

    info!(task = id, cmd = %task.command, "starting task");
    store.set_task_status(id, TaskStatus::Processing)?;
    store.set_task_started(id, Utc::now())?;

    let mut ps = match ProcessHandle::spawn(&task.command) {
        Ok(ps) => ps,
        Err(e) => {
            error!(task = id, error = %e, "process could not be spawned");
            store.set_task_status(id, TaskStatus::Error)?;
            store.set_task_ended(id, Utc::now())?;
            return Err(e);
        }
    };
    store.set_task_pid(id, Some(ps.pid()))?;

    let terminated = observe(store, id, &mut ps, task.timeout.map(|t| t.to_chrono())).await?;

    store.set_task_ended(id, Utc::now())?;

    let out = tokio::time::timeout(DRAIN_TIMEOUT, ps.drain_stdout())
        .await
        .unwrap_or_default();
    store.append_task_stdout(id, &out)?;
    let err = tokio::time::timeout(DRAIN_TIMEOUT, ps.drain_stderr())
        .await
        .unwrap_or_default();
    store.append_task_stderr(id, &err)?;

    if !terminated {
        let status = if ps.poll().exit_code == Some(0) {
            TaskStatus::Completed
        } else {
            TaskStatus::Error
        };
        store.set_task_status(id, status)?;
    }

    let final_status = store.task(id)?.status;
    info!(task = id, status = ?final_status, "task finished");

    if check && matches!(final_status, TaskStatus::Error | TaskStatus::Terminated) {
        return Err(RecorderError::Process {
            task: id,
            status: final_status,
        });
    }
    Ok(())
}

/// The observation loop. Returns true when the task was marked Terminated
/// (timeout or external request), in which case finalisation must not touch
/// the status again.
async fn observe(
    store: &dyn Store,
    id: Id,
    ps: &mut ProcessHandle,
    timeout: Option<chrono::Duration>,
) -> Result<bool> {
    let started = Utc::now();
    let mut tick: u64 = 0;

    loop {
        tick += 1;

        if let Some(line) = ps.read_stderr_line() {
            store.append_task_stderr(id, &with_newline(line))?;
        }
        if let Some(line) = ps.read_stdout_line() {
            store.append_task_stdout(id, &with_newline(line))?;
        }

        // Timeout check runs first within the tick. If the process already
        // exited on its own we fall through to exit finalisation instead, so
        // a same-tick natural exit still reports Completed.
        if let Some(limit) = timeout {
            if Utc::now() - started >= limit {
                if !ps.poll().running {
                    break;
                }
                warn!(task = id, "task hit its timeout; terminating process");
                ps.stop().await;
                store.set_task_status(id, TaskStatus::Terminated)?;
                return Ok(true);
            }
        }

        if tick % REREAD_TICKS == 0 {
            let row = store.task(id)?;
            if row.status == TaskStatus::Terminated {
                warn!(task = id, "task terminated externally; stopping process");
                ps.stop().await;
                return Ok(true);
            }
            debug!(task = id, seconds = tick, "task still running");
        }

        if !ps.poll().running {
            break;
        }

        tokio::time::sleep(TICK).await;
    }

    Ok(false)
}

/// Terminate a task by its persisted pid. Idempotent: a task whose process is
/// already gone is still marked Terminated.
pub async fn terminate_task(store: &dyn Store, id: Id) -> Result<()> {
    let task = store.task(id)?;

    match task.pid {
        Some(pid) if pid_exists(pid) => {
            info!(task = id, pid, "terminating task process");
            terminate_pid(pid).await;
        }
        _ => debug!(task = id, "no live process; marking terminated"),
    }

    store.set_task_status(id, TaskStatus::Terminated)
}

fn with_newline(mut line: String) -> String {
    line.push('\n');
    line
}
