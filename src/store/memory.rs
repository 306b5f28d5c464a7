// src/store/memory.rs

//! In-memory [`Store`] implementation.
//!
//! Tables are `BTreeMap`s behind one mutex; ids come from a single counter so
//! they are unique across entities. Events go out over a tokio broadcast
//! channel after the table lock is released.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::errors::{RecorderError, Result};
use crate::model::channel::{validate_name, validate_url};
use crate::model::{
    Category, Channel, Id, NewChannel, NewSchedule, NewTask, QueueRow, QueueStatus, Schedule,
    ScheduleStatus, TaskRow, TaskStatus,
};
use crate::store::{ChangeKind, Entity, Store, StoreEvent};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct Tables {
    categories: BTreeMap<Id, Category>,
    channels: BTreeMap<Id, Channel>,
    schedules: BTreeMap<Id, Schedule>,
    queues: BTreeMap<Id, QueueRow>,
    tasks: BTreeMap<Id, TaskRow>,
    next_id: Id,
}

impl Tables {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tables: Mutex::new(Tables::default()),
            events,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // A poisoned lock only means another writer panicked mid-write;
        // the tables themselves are always row-consistent.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, entity: Entity, id: Id, kind: ChangeKind, changed_fields: Vec<&'static str>) {
        // No receivers is fine; subscribers that lag simply re-read rows.
        let _ = self.events.send(StoreEvent {
            entity,
            id,
            kind,
            changed_fields,
        });
    }

    fn not_found(entity: &'static str, id: Id) -> RecorderError {
        RecorderError::NotFound { entity, id }
    }
}

/// Best-effort removal of a task's placeholder output file.
fn remove_output_file(task: &TaskRow) {
    if let Some(path) = &task.output {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(task = task.id, path = %path.display(), error = %e, "could not remove output file");
            }
        }
    }
}

impl Store for MemoryStore {
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // -- categories ---------------------------------------------------------

    fn insert_category(&self, name: &str) -> Result<Category> {
        validate_name(name)?;
        let row = {
            let mut t = self.lock();
            if t.categories.values().any(|c| c.name == name) {
                return Err(RecorderError::Validation(format!(
                    "category '{name}' already exists"
                )));
            }
            let now = Utc::now();
            let row = Category {
                id: t.next_id(),
                name: name.to_string(),
                created_at: now,
                updated_at: now,
            };
            t.categories.insert(row.id, row.clone());
            row
        };
        self.emit(Entity::Category, row.id, ChangeKind::Created, vec![]);
        Ok(row)
    }

    fn category(&self, id: Id) -> Result<Category> {
        self.lock()
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::not_found("category", id))
    }

    fn category_by_name(&self, name: &str) -> Option<Category> {
        self.lock()
            .categories
            .values()
            .find(|c| c.name == name)
            .cloned()
    }

    fn categories(&self) -> Vec<Category> {
        self.lock().categories.values().cloned().collect()
    }

    fn channel_count(&self, category: Id) -> usize {
        self.lock()
            .channels
            .values()
            .filter(|c| c.category == Some(category))
            .count()
    }

    // -- channels -----------------------------------------------------------

    fn insert_channel(&self, new: NewChannel) -> Result<Channel> {
        validate_name(&new.name)?;
        validate_url(&new.url)?;
        let row = {
            let mut t = self.lock();
            if t.channels.values().any(|c| c.name == new.name) {
                return Err(RecorderError::Validation(format!(
                    "channel '{}' already exists",
                    new.name
                )));
            }
            if let Some(cat) = new.category {
                if !t.categories.contains_key(&cat) {
                    return Err(Self::not_found("category", cat));
                }
            }
            let now = Utc::now();
            let row = Channel {
                id: t.next_id(),
                name: new.name,
                url: new.url,
                category: new.category,
                created_at: now,
                updated_at: now,
            };
            t.channels.insert(row.id, row.clone());
            row
        };
        self.emit(Entity::Channel, row.id, ChangeKind::Created, vec![]);
        Ok(row)
    }

    fn update_channel(&self, id: Id, url: &str, category: Option<Id>) -> Result<()> {
        validate_url(url)?;
        let mut fields = vec!["url"];
        {
            let mut t = self.lock();
            if let Some(cat) = category {
                if !t.categories.contains_key(&cat) {
                    return Err(Self::not_found("category", cat));
                }
            }
            let row = t
                .channels
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("channel", id))?;
            row.url = url.to_string();
            if category.is_some() {
                row.category = category;
                fields.push("category");
            }
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Channel, id, ChangeKind::Updated, fields);
        Ok(())
    }

    fn channel(&self, id: Id) -> Result<Channel> {
        self.lock()
            .channels
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::not_found("channel", id))
    }

    fn channel_by_name(&self, name: &str) -> Option<Channel> {
        self.lock()
            .channels
            .values()
            .find(|c| c.name == name)
            .cloned()
    }

    fn channels(&self) -> Vec<Channel> {
        self.lock().channels.values().cloned().collect()
    }

    // -- schedules ----------------------------------------------------------

    fn insert_schedule(&self, new: NewSchedule) -> Result<Schedule> {
        validate_name(&new.name)?;
        let row = {
            let mut t = self.lock();
            if !t.channels.contains_key(&new.channel) {
                return Err(Self::not_found("channel", new.channel));
            }
            let now = Utc::now();
            let row = Schedule {
                id: t.next_id(),
                channel: new.channel,
                name: new.name,
                start_time: new.start_time,
                duration: new.duration,
                status: ScheduleStatus::Scheduled,
                queue: None,
                resize: new.resize,
                user: new.user,
                file: None,
                pid: None,
                terminate: false,
                log: String::new(),
                created_at: now,
                updated_at: now,
            };
            t.schedules.insert(row.id, row.clone());
            row
        };
        self.emit(Entity::Schedule, row.id, ChangeKind::Created, vec![]);
        Ok(row)
    }

    fn schedule(&self, id: Id) -> Result<Schedule> {
        self.lock()
            .schedules
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::not_found("schedule", id))
    }

    fn schedules(&self) -> Vec<Schedule> {
        self.lock().schedules.values().cloned().collect()
    }

    fn schedules_with_status(&self, status: ScheduleStatus) -> Vec<Schedule> {
        self.lock()
            .schedules
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect()
    }

    fn schedule_for_queue(&self, queue: Id) -> Option<Schedule> {
        self.lock()
            .schedules
            .values()
            .find(|s| s.queue == Some(queue))
            .cloned()
    }

    fn set_schedule_status(&self, id: Id, status: ScheduleStatus) -> Result<()> {
        {
            let mut t = self.lock();
            let row = t
                .schedules
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("schedule", id))?;
            if row.status == status {
                debug!(schedule = id, ?status, "schedule status unchanged");
                return Ok(());
            }
            // Schedule statuses are last-writer-wins: the mirror and a
            // restarted recorder may both write, and a retry legitimately
            // moves Error back to Processing.
            debug!(schedule = id, from = ?row.status, to = ?status, "schedule status changing");
            row.status = status;
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Schedule, id, ChangeKind::Updated, vec!["status"]);
        Ok(())
    }

    fn set_schedule_queue(&self, id: Id, queue: Id) -> Result<()> {
        {
            let mut t = self.lock();
            if !t.queues.contains_key(&queue) {
                return Err(Self::not_found("queue", queue));
            }
            let row = t
                .schedules
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("schedule", id))?;
            row.queue = Some(queue);
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Schedule, id, ChangeKind::Updated, vec!["queue"]);
        Ok(())
    }

    fn set_schedule_file(&self, id: Id, file: Option<PathBuf>) -> Result<()> {
        {
            let mut t = self.lock();
            let row = t
                .schedules
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("schedule", id))?;
            row.file = file;
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Schedule, id, ChangeKind::Updated, vec!["file"]);
        Ok(())
    }

    fn set_schedule_pid(&self, id: Id, pid: Option<u32>) -> Result<()> {
        {
            let mut t = self.lock();
            let row = t
                .schedules
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("schedule", id))?;
            row.pid = pid;
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Schedule, id, ChangeKind::Updated, vec!["pid"]);
        Ok(())
    }

    fn request_schedule_terminate(&self, id: Id) -> Result<()> {
        {
            let mut t = self.lock();
            let row = t
                .schedules
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("schedule", id))?;
            if row.terminate {
                return Ok(());
            }
            row.terminate = true;
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Schedule, id, ChangeKind::Updated, vec!["terminate"]);
        Ok(())
    }

    fn append_schedule_log(&self, id: Id, text: &str) -> Result<()> {
        {
            let mut t = self.lock();
            let row = t
                .schedules
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("schedule", id))?;
            row.log.push_str(text);
            if !text.ends_with('\n') {
                row.log.push('\n');
            }
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Schedule, id, ChangeKind::Updated, vec!["log"]);
        Ok(())
    }

    fn delete_schedule(&self, id: Id) -> Result<()> {
        let queue = {
            let mut t = self.lock();
            let row = t
                .schedules
                .remove(&id)
                .ok_or_else(|| Self::not_found("schedule", id))?;
            row.queue
        };
        self.emit(Entity::Schedule, id, ChangeKind::Deleted, vec![]);
        if let Some(queue) = queue {
            self.delete_queue(queue)?;
        }
        Ok(())
    }

    // -- queues -------------------------------------------------------------

    fn insert_queue(&self, timer: Option<DateTime<Utc>>) -> Result<QueueRow> {
        let row = {
            let mut t = self.lock();
            let now = Utc::now();
            let row = QueueRow {
                id: t.next_id(),
                status: QueueStatus::Created,
                timer,
                started_at: None,
                ended_at: None,
                created_at: now,
                updated_at: now,
            };
            t.queues.insert(row.id, row.clone());
            row
        };
        self.emit(Entity::Queue, row.id, ChangeKind::Created, vec![]);
        Ok(row)
    }

    fn queue(&self, id: Id) -> Result<QueueRow> {
        self.lock()
            .queues
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::not_found("queue", id))
    }

    fn queues_with_status(&self, status: QueueStatus) -> Vec<QueueRow> {
        let mut rows: Vec<QueueRow> = self
            .lock()
            .queues
            .values()
            .filter(|q| q.status == status)
            .cloned()
            .collect();
        rows.sort_by_key(|q| q.timer);
        rows
    }

    fn set_queue_status(&self, id: Id, status: QueueStatus) -> Result<()> {
        {
            let mut t = self.lock();
            let row = t
                .queues
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("queue", id))?;
            if row.status == status {
                return Ok(());
            }
            if row.status.is_terminal() {
                warn!(
                    queue = id,
                    current = ?row.status,
                    requested = ?status,
                    "refusing to overwrite terminal queue status"
                );
                return Ok(());
            }
            debug!(queue = id, from = ?row.status, to = ?status, "queue status changing");
            row.status = status;
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Queue, id, ChangeKind::Updated, vec!["status"]);
        Ok(())
    }

    fn set_queue_started(&self, id: Id, at: DateTime<Utc>) -> Result<()> {
        {
            let mut t = self.lock();
            let row = t
                .queues
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("queue", id))?;
            row.started_at = Some(at);
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Queue, id, ChangeKind::Updated, vec!["started_at"]);
        Ok(())
    }

    fn set_queue_ended(&self, id: Id, at: DateTime<Utc>) -> Result<()> {
        {
            let mut t = self.lock();
            let row = t
                .queues
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("queue", id))?;
            row.ended_at = Some(at);
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Queue, id, ChangeKind::Updated, vec!["ended_at"]);
        Ok(())
    }

    fn delete_queue(&self, id: Id) -> Result<()> {
        let removed_tasks = {
            let mut t = self.lock();
            if t.queues.remove(&id).is_none() {
                return Err(Self::not_found("queue", id));
            }
            let task_ids: Vec<Id> = t
                .tasks
                .values()
                .filter(|task| task.queue == Some(id))
                .map(|task| task.id)
                .collect();
            let mut removed = Vec::with_capacity(task_ids.len());
            for task_id in task_ids {
                if let Some(task) = t.tasks.remove(&task_id) {
                    removed.push(task);
                }
            }
            removed
        };
        self.emit(Entity::Queue, id, ChangeKind::Deleted, vec![]);
        for task in removed_tasks {
            remove_output_file(&task);
            self.emit(Entity::Task, task.id, ChangeKind::Deleted, vec![]);
        }
        Ok(())
    }

    // -- tasks --------------------------------------------------------------

    fn insert_task(&self, new: NewTask) -> Result<TaskRow> {
        let row = {
            let mut t = self.lock();
            if let Some(dep) = new.depends_on {
                if !t.tasks.contains_key(&dep) {
                    return Err(Self::not_found("task", dep));
                }
            }
            let now = Utc::now();
            let row = TaskRow {
                id: t.next_id(),
                queue: None,
                line: 0,
                name: new.name,
                depends_on: new.depends_on,
                timeout: new.timeout,
                stderr: String::new(),
                stdout: String::new(),
                pid: None,
                status: TaskStatus::Created,
                started_at: None,
                ended_at: None,
                command: new.command,
                output: new.output,
                created_at: now,
                updated_at: now,
            };
            t.tasks.insert(row.id, row.clone());
            row
        };
        self.emit(Entity::Task, row.id, ChangeKind::Created, vec![]);
        Ok(row)
    }

    fn task(&self, id: Id) -> Result<TaskRow> {
        self.lock()
            .tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::not_found("task", id))
    }

    fn tasks_in_queue(&self, queue: Id) -> Vec<TaskRow> {
        let mut rows: Vec<TaskRow> = self
            .lock()
            .tasks
            .values()
            .filter(|task| task.queue == Some(queue))
            .cloned()
            .collect();
        rows.sort_by_key(|task| task.line);
        rows
    }

    fn attach_task(&self, task: Id, queue: Id, line: u32) -> Result<()> {
        {
            let mut t = self.lock();
            if !t.queues.contains_key(&queue) {
                return Err(Self::not_found("queue", queue));
            }
            let row = t
                .tasks
                .get_mut(&task)
                .ok_or_else(|| Self::not_found("task", task))?;
            row.queue = Some(queue);
            row.line = line;
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Task, task, ChangeKind::Updated, vec!["queue", "line"]);
        Ok(())
    }

    fn set_task_status(&self, id: Id, status: TaskStatus) -> Result<()> {
        {
            let mut t = self.lock();
            let row = t
                .tasks
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("task", id))?;
            if row.status == status {
                debug!(task = id, ?status, "task status unchanged");
                return Ok(());
            }
            if row.status.is_terminal() {
                warn!(
                    task = id,
                    current = ?row.status,
                    requested = ?status,
                    "refusing to overwrite terminal task status"
                );
                return Ok(());
            }
            debug!(task = id, from = ?row.status, to = ?status, "task status changing");
            row.status = status;
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Task, id, ChangeKind::Updated, vec!["status"]);
        Ok(())
    }

    fn set_task_pid(&self, id: Id, pid: Option<u32>) -> Result<()> {
        {
            let mut t = self.lock();
            let row = t
                .tasks
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("task", id))?;
            row.pid = pid;
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Task, id, ChangeKind::Updated, vec!["pid"]);
        Ok(())
    }

    fn set_task_started(&self, id: Id, at: DateTime<Utc>) -> Result<()> {
        {
            let mut t = self.lock();
            let row = t
                .tasks
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("task", id))?;
            row.started_at = Some(at);
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Task, id, ChangeKind::Updated, vec!["started_at"]);
        Ok(())
    }

    fn set_task_ended(&self, id: Id, at: DateTime<Utc>) -> Result<()> {
        {
            let mut t = self.lock();
            let row = t
                .tasks
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("task", id))?;
            row.ended_at = Some(at);
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Task, id, ChangeKind::Updated, vec!["ended_at"]);
        Ok(())
    }

    fn append_task_stdout(&self, id: Id, chunk: &str) -> Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        {
            let mut t = self.lock();
            let row = t
                .tasks
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("task", id))?;
            row.stdout.push_str(chunk);
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Task, id, ChangeKind::Updated, vec!["stdout"]);
        Ok(())
    }

    fn append_task_stderr(&self, id: Id, chunk: &str) -> Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        {
            let mut t = self.lock();
            let row = t
                .tasks
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("task", id))?;
            row.stderr.push_str(chunk);
            row.updated_at = Utc::now();
        }
        self.emit(Entity::Task, id, ChangeKind::Updated, vec!["stderr"]);
        Ok(())
    }

    fn clear_task(&self, id: Id) -> Result<()> {
        {
            let mut t = self.lock();
            let row = t
                .tasks
                .get_mut(&id)
                .ok_or_else(|| Self::not_found("task", id))?;
            if row.status == TaskStatus::Processing {
                return Err(RecorderError::Status(format!(
                    "task {id} is Processing; terminate it before clearing"
                )));
            }
            row.status = TaskStatus::Created;
            row.pid = None;
            row.stdout.clear();
            row.stderr.clear();
            row.started_at = None;
            row.ended_at = None;
            row.updated_at = Utc::now();
        }
        self.emit(
            Entity::Task,
            id,
            ChangeKind::Updated,
            vec!["status", "pid", "stdout", "stderr", "started_at", "ended_at"],
        );
        Ok(())
    }
}
