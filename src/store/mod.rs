// src/store/mod.rs

//! Persistence boundary.
//!
//! Every component (daemon, workers, reactor, CLI) shares state exclusively
//! through a [`Store`]: rows are read and written by primary key, and every
//! write emits a [`StoreEvent`] naming the entity, the change kind and the
//! fields it touched. Subscribers (the reactor) react to those events; there
//! is no hidden registry and no shared in-memory graph across workers.
//!
//! Status setters are deliberately forgiving:
//! - writing the status a row already has is a no-op (idempotent),
//! - a terminal status is never overwritten by a different one; the only way
//!   out of a terminal task state is [`Store::clear_task`].
//!
//! [`memory::MemoryStore`] is the in-process implementation.

pub mod memory;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::errors::Result;
use crate::model::{
    Category, Channel, Id, NewChannel, NewSchedule, NewTask, QueueRow, QueueStatus, Schedule,
    ScheduleStatus, TaskRow, TaskStatus,
};

pub use memory::MemoryStore;

/// Which table a [`StoreEvent`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Category,
    Channel,
    Schedule,
    Queue,
    Task,
}

/// What happened to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// One persisted write, as seen by subscribers.
///
/// `changed_fields` carries the field names the write touched; subscribers
/// use it to ignore writes they don't care about (e.g. stdio appends).
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub entity: Entity,
    pub id: Id,
    pub kind: ChangeKind,
    pub changed_fields: Vec<&'static str>,
}

/// Typed read/write operations over the persisted entities.
pub trait Store: Send + Sync + 'static {
    /// Subscribe to the write stream. Lagging receivers drop old events;
    /// consumers must re-read rows by id rather than trust event payloads.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;

    // -- categories ---------------------------------------------------------

    fn insert_category(&self, name: &str) -> Result<Category>;
    fn category(&self, id: Id) -> Result<Category>;
    fn category_by_name(&self, name: &str) -> Option<Category>;
    fn categories(&self) -> Vec<Category>;
    /// Number of channels referencing a category.
    fn channel_count(&self, category: Id) -> usize;

    // -- channels -----------------------------------------------------------

    fn insert_channel(&self, new: NewChannel) -> Result<Channel>;
    /// Update an existing channel's url (and category when given).
    fn update_channel(&self, id: Id, url: &str, category: Option<Id>) -> Result<()>;
    fn channel(&self, id: Id) -> Result<Channel>;
    fn channel_by_name(&self, name: &str) -> Option<Channel>;
    fn channels(&self) -> Vec<Channel>;

    // -- schedules ----------------------------------------------------------

    fn insert_schedule(&self, new: NewSchedule) -> Result<Schedule>;
    fn schedule(&self, id: Id) -> Result<Schedule>;
    fn schedules(&self) -> Vec<Schedule>;
    fn schedules_with_status(&self, status: ScheduleStatus) -> Vec<Schedule>;
    /// The schedule owning a queue, if any.
    fn schedule_for_queue(&self, queue: Id) -> Option<Schedule>;
    fn set_schedule_status(&self, id: Id, status: ScheduleStatus) -> Result<()>;
    fn set_schedule_queue(&self, id: Id, queue: Id) -> Result<()>;
    fn set_schedule_file(&self, id: Id, file: Option<PathBuf>) -> Result<()>;
    fn set_schedule_pid(&self, id: Id, pid: Option<u32>) -> Result<()>;
    /// Raise the persisted cancellation flag. Any controller may call this;
    /// the running supervisor acts on it at its next poll.
    fn request_schedule_terminate(&self, id: Id) -> Result<()>;
    /// Append a line to the schedule's free-text log.
    fn append_schedule_log(&self, id: Id, text: &str) -> Result<()>;
    /// Delete a schedule; cascades to its queue (and that queue's tasks).
    fn delete_schedule(&self, id: Id) -> Result<()>;

    // -- queues -------------------------------------------------------------

    fn insert_queue(&self, timer: Option<DateTime<Utc>>) -> Result<QueueRow>;
    fn queue(&self, id: Id) -> Result<QueueRow>;
    fn queues_with_status(&self, status: QueueStatus) -> Vec<QueueRow>;
    fn set_queue_status(&self, id: Id, status: QueueStatus) -> Result<()>;
    fn set_queue_started(&self, id: Id, at: DateTime<Utc>) -> Result<()>;
    fn set_queue_ended(&self, id: Id, at: DateTime<Utc>) -> Result<()>;
    /// Delete a queue; cascades to its tasks (and their placeholder files).
    fn delete_queue(&self, id: Id) -> Result<()>;

    // -- tasks --------------------------------------------------------------

    fn insert_task(&self, new: NewTask) -> Result<TaskRow>;
    fn task(&self, id: Id) -> Result<TaskRow>;
    /// Tasks of a queue in ascending `line` order.
    fn tasks_in_queue(&self, queue: Id) -> Vec<TaskRow>;
    /// Put a task into a queue at the given line.
    fn attach_task(&self, task: Id, queue: Id, line: u32) -> Result<()>;
    fn set_task_status(&self, id: Id, status: TaskStatus) -> Result<()>;
    fn set_task_pid(&self, id: Id, pid: Option<u32>) -> Result<()>;
    fn set_task_started(&self, id: Id, at: DateTime<Utc>) -> Result<()>;
    fn set_task_ended(&self, id: Id, at: DateTime<Utc>) -> Result<()>;
    fn append_task_stdout(&self, id: Id, chunk: &str) -> Result<()>;
    fn append_task_stderr(&self, id: Id, chunk: &str) -> Result<()>;
    /// Reset a non-Processing task to `Created`, clearing pid, stdio buffers
    /// and timestamps. The only sanctioned exit from a terminal state.
    fn clear_task(&self, id: Id) -> Result<()>;
}
