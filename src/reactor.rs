// src/reactor.rs

//! Store-event subscriber tying schedules, queues and tasks together.
//!
//! The reactor listens on [`Store::subscribe`] and reacts to three writes:
//! - a created schedule gets its queue and tasks built;
//! - a task status change re-derives the owning queue's status;
//! - a queue status change is mirrored onto the owning schedule.
//!
//! Everything the reactor does is expressed as further store writes, so the
//! status flow task → queue → schedule converges without any component
//! addressing another directly.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::{add_task, calculate_queue_status};
use crate::errors::{RecorderError, Result};
use crate::model::{Hms, Id, NewTask, QueueStatus, ScheduleStatus};
use crate::recorder::command::CommandBuilder;
use crate::recorder::output;
use crate::store::{ChangeKind, Entity, Store, StoreEvent};

/// Extra slack on a record task's timeout beyond the recording duration.
const TASK_TIMEOUT_SLACK_SECS: u64 = 60;

/// Spawn the reactor loop. Runs until the store (and its event channel) is
/// dropped; a lagged receiver logs and keeps going — rows are always re-read
/// by id, so missed events only delay convergence until the next daemon tick.
pub fn spawn(
    store: Arc<dyn Store>,
    commands: Arc<dyn CommandBuilder>,
    video_dir: PathBuf,
) -> JoinHandle<()> {
    let mut rx = store.subscribe();

    tokio::spawn(async move {
        info!("reactor started");
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = handle_event(store.as_ref(), commands.as_ref(), &video_dir, &event)
                    {
                        error!(?event, error = %e, "reactor handler failed");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "reactor lagged behind store events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        info!("reactor exiting");
    })
}

fn handle_event(
    store: &dyn Store,
    commands: &dyn CommandBuilder,
    video_dir: &std::path::Path,
    event: &StoreEvent,
) -> Result<()> {
    match (event.entity, event.kind) {
        (Entity::Schedule, ChangeKind::Created) => on_schedule_created(store, commands, video_dir, event.id),
        (Entity::Task, ChangeKind::Updated) if event.changed_fields.contains(&"status") => {
            on_task_status_change(store, event.id)
        }
        (Entity::Queue, ChangeKind::Updated) if event.changed_fields.contains(&"status") => {
            on_queue_status_change(store, event.id)
        }
        _ => Ok(()),
    }
}

/// Build the queue (timer = start time), the record task and the optional
/// resize task for a fresh schedule, then hang the queue off the schedule.
fn on_schedule_created(
    store: &dyn Store,
    commands: &dyn CommandBuilder,
    video_dir: &std::path::Path,
    id: Id,
) -> Result<()> {
    let schedule = match store.schedule(id) {
        Ok(s) => s,
        Err(RecorderError::NotFound { .. }) => {
            debug!(schedule = id, "schedule gone before reactor saw it");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    let channel = store.channel(schedule.channel)?;

    let queue = store.insert_queue(Some(schedule.start_time))?;

    let record_stem = format!(
        "rec-{}-{}",
        schedule.id,
        schedule.start_time.format("%Y%m%d%H%M%S")
    );
    let record_out = output::create_placeholder(video_dir, &record_stem, output::DEFAULT_EXT)?;
    let record_task = store.insert_task(NewTask {
        name: Some("record".to_string()),
        depends_on: None,
        timeout: Some(Hms::from_secs(
            schedule.duration.total_seconds() + TASK_TIMEOUT_SLACK_SECS,
        )),
        command: commands.record(&channel.url, &record_out, schedule.duration),
        output: Some(record_out.clone()),
    })?;
    add_task(store, queue.id, record_task.id)?;

    if let Some(resize) = schedule.resize {
        let resize_stem = format!("rec-{}-{}x{}", schedule.id, resize.width, resize.height);
        let resize_out = output::create_placeholder(video_dir, &resize_stem, output::DEFAULT_EXT)?;
        let resize_task = store.insert_task(NewTask {
            name: Some("resize".to_string()),
            depends_on: Some(record_task.id),
            timeout: None,
            command: commands.resize(&record_out, &resize_out, resize),
            output: Some(resize_out),
        })?;
        add_task(store, queue.id, resize_task.id)?;
    }

    store.set_schedule_queue(id, queue.id)?;
    info!(schedule = id, queue = queue.id, "queue built for schedule");
    Ok(())
}

/// Any task status change re-derives the owning queue's status.
fn on_task_status_change(store: &dyn Store, id: Id) -> Result<()> {
    let task = match store.task(id) {
        Ok(t) => t,
        Err(RecorderError::NotFound { .. }) => return Ok(()),
        Err(e) => return Err(e),
    };
    if let Some(queue) = task.queue {
        match calculate_queue_status(store, queue) {
            Ok(_) | Err(RecorderError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Mirror a queue status onto the owning schedule.
fn on_queue_status_change(store: &dyn Store, id: Id) -> Result<()> {
    let queue = match store.queue(id) {
        Ok(q) => q,
        Err(RecorderError::NotFound { .. }) => return Ok(()),
        Err(e) => return Err(e),
    };
    let Some(schedule) = store.schedule_for_queue(id) else {
        return Ok(());
    };

    let mirrored = match queue.status {
        QueueStatus::Processing => Some(ScheduleStatus::Processing),
        QueueStatus::Completed => {
            // The last task's product becomes the schedule's file.
            if let Some(last) = store.tasks_in_queue(id).last() {
                if last.output.is_some() {
                    store.set_schedule_file(schedule.id, last.output.clone())?;
                }
            }
            Some(ScheduleStatus::Completed)
        }
        QueueStatus::Error => Some(ScheduleStatus::Error),
        QueueStatus::Timeout => Some(ScheduleStatus::Timeout),
        QueueStatus::Stopped => Some(ScheduleStatus::Canceled),
        QueueStatus::Created => None,
    };

    if let Some(status) = mirrored {
        debug!(schedule = schedule.id, queue = id, ?status, "mirroring queue status");
        store.set_schedule_status(schedule.id, status)?;
    }
    Ok(())
}
