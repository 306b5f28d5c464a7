// src/engine/queue.rs

//! Queue-level operations: insertion, sequential execution, stop, roll-up.

use chrono::Utc;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, error, info, warn};

use crate::engine::task::run_task;
use crate::errors::{RecorderError, Result};
use crate::model::{Id, QueueStatus, TaskRow, TaskStatus};
use crate::store::Store;

/// Append a task to a queue at the next line.
///
/// If the task's dependency is not yet in the queue it is added first
/// (recursively), so ancestors always precede dependents in line order.
/// Re-adding a task is a warn-level no-op. Fails with a status error when the
/// queue already left Created, and with a dependence-cycle error when the new
/// edge would make the queue's dependency graph cyclic.
pub fn add_task(store: &dyn Store, queue: Id, task: Id) -> Result<()> {
    let q = store.queue(queue)?;
    if q.status != QueueStatus::Created {
        return Err(RecorderError::Status(format!(
            "queue {queue} is {:?}; tasks can only be added while Created",
            q.status
        )));
    }

    let row = store.task(task)?;

    if let Some(dep) = row.depends_on {
        let dep_row = store.task(dep)?;
        if dep_row.queue != Some(queue) {
            debug!(queue, task, dependency = dep, "pulling dependency into queue first");
            add_task(store, queue, dep)?;
        }
    }

    let members = store.tasks_in_queue(queue);
    if members.iter().any(|t| t.id == task) {
        warn!(queue, task, "task already in queue");
        return Ok(());
    }

    ensure_acyclic(&members, &row)?;

    let line = members.len() as u32 + 1;
    store.attach_task(task, queue, line)?;
    debug!(queue, task, line, "task added to queue");
    Ok(())
}

/// Reject a task whose dependency edge would create a cycle among the
/// queue's tasks. Edge direction: dependency -> dependent.
fn ensure_acyclic(members: &[TaskRow], candidate: &TaskRow) -> Result<()> {
    let mut graph: DiGraphMap<Id, ()> = DiGraphMap::new();

    for t in members.iter().chain(std::iter::once(candidate)) {
        graph.add_node(t.id);
        if let Some(dep) = t.depends_on {
            graph.add_edge(dep, t.id, ());
        }
    }

    match toposort(&graph, None) {
        Ok(_) => Ok(()),
        Err(_) => Err(RecorderError::DependenceCycle {
            task: candidate.id,
            depends_on: candidate.depends_on.unwrap_or(candidate.id),
        }),
    }
}

/// Run a queue's tasks sequentially in line order.
///
/// Tasks that are not Created, or whose dependency is not Completed, are
/// skipped with a warning; a failed task does not abort the queue. A
/// dependence error raised by the runner itself is fatal: the queue goes to
/// Error and iteration stops.
pub async fn start_queue(store: &dyn Store, id: Id) -> Result<()> {
    let tasks = store.tasks_in_queue(id);
    if tasks.is_empty() {
        warn!(queue = id, "no tasks to run");
        return Ok(());
    }

    debug!(queue = id, tasks = tasks.len(), "queue starting");
    store.set_queue_status(id, QueueStatus::Processing)?;
    store.set_queue_started(id, Utc::now())?;

    let result = run_in_line_order(store, id).await;

    store.set_queue_ended(id, Utc::now())?;
    // The daemon and reactor reconcile every tick as well; doing it here just
    // closes the common case without waiting for the next tick.
    calculate_queue_status(store, id)?;
    debug!(queue = id, "queue finished");

    result
}

async fn run_in_line_order(store: &dyn Store, id: Id) -> Result<()> {
    for task in store.tasks_in_queue(id) {
        if task.status != TaskStatus::Created {
            warn!(queue = id, task = task.id, status = ?task.status, "skipping task not in Created");
            continue;
        }

        if let Some(dep) = task.depends_on {
            let dep_row = store.task(dep)?;
            if dep_row.status != TaskStatus::Completed {
                warn!(
                    queue = id,
                    task = task.id,
                    dependency = dep,
                    status = ?dep_row.status,
                    "skipping task with unfinished dependency"
                );
                continue;
            }
        }

        info!(queue = id, task = task.id, "starting task");
        match run_task(store, task.id, false).await {
            Ok(()) => info!(queue = id, task = task.id, "task done"),
            Err(
                e @ (RecorderError::Dependence { .. } | RecorderError::DependenceCycle { .. }),
            ) => {
                error!(queue = id, task = task.id, error = %e, "dependence error; aborting queue");
                store.set_queue_status(id, QueueStatus::Error)?;
                return Err(e);
            }
            Err(
                e @ (RecorderError::Command(_)
                | RecorderError::Status(_)
                | RecorderError::Spawn(_)
                | RecorderError::Process { .. }),
            ) => {
                // The roll-up surfaces the failure on the queue status.
                error!(queue = id, task = task.id, error = %e, "task failed; queue continues");
            }
            Err(e) => {
                error!(queue = id, task = task.id, error = %e, "unexpected failure; aborting queue");
                store.set_queue_status(id, QueueStatus::Error)?;
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Mark all Processing tasks Terminated and the queue Stopped.
pub fn stop_queue(store: &dyn Store, id: Id) -> Result<()> {
    for task in store.tasks_in_queue(id) {
        if task.status == TaskStatus::Processing {
            store.set_task_status(task.id, TaskStatus::Terminated)?;
        }
    }
    store.set_queue_status(id, QueueStatus::Stopped)
}

/// Pure roll-up of a queue status from its member tasks.
///
/// Returns `None` when the members don't determine a status (leave
/// unchanged); `Stopped` and `Timeout` are never produced here — they are
/// imposed from outside.
pub fn roll_up(tasks: &[TaskRow]) -> Option<QueueStatus> {
    if tasks.is_empty() {
        return None;
    }
    if tasks.iter().any(|t| t.status == TaskStatus::Error) {
        Some(QueueStatus::Error)
    } else if tasks.iter().all(|t| t.status == TaskStatus::Completed) {
        Some(QueueStatus::Completed)
    } else if tasks.iter().any(|t| t.status == TaskStatus::Processing) {
        Some(QueueStatus::Processing)
    } else {
        None
    }
}

/// Apply [`roll_up`] to a persisted queue; returns the (possibly unchanged)
/// status.
pub fn calculate_queue_status(store: &dyn Store, id: Id) -> Result<QueueStatus> {
    let q = store.queue(id)?;
    let tasks = store.tasks_in_queue(id);

    match roll_up(&tasks) {
        Some(next) if next != q.status => {
            store.set_queue_status(id, next)?;
            Ok(next)
        }
        _ => Ok(q.status),
    }
}
