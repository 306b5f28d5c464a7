// src/model/task.rs

//! Task rows: one shell command with status, dependency and timeout.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::status::TaskStatus;
use crate::model::time::Hms;
use crate::model::Id;

/// A single unit of execution inside a queue.
///
/// `line` is the execution order within the queue (ascending, 1-based).
/// `depends_on` must point at a task in the same queue; `add_task` pulls
/// missing ancestors in and rejects cycles. `output` records the media file
/// the command writes, so the queue → schedule mirror can publish the last
/// task's product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: Id,
    pub queue: Option<Id>,
    pub line: u32,
    pub name: Option<String>,
    pub depends_on: Option<Id>,
    pub timeout: Option<Hms>,
    pub stderr: String,
    pub stdout: String,
    pub pid: Option<u32>,
    pub status: TaskStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub command: String,
    pub output: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub name: Option<String>,
    pub depends_on: Option<Id>,
    pub timeout: Option<Hms>,
    pub command: String,
    pub output: Option<PathBuf>,
}
