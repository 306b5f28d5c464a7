// src/model/status.rs

//! Status enums for tasks, queues and schedules.
//!
//! Statuses are serialized by name; there are no integer codes. Terminal
//! states are only left via an explicit `clear` (tasks) — ordinary setters
//! never reverse them.

use serde::{Deserialize, Serialize};

/// Lifecycle of a single task (one shell command).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Created,
    Processing,
    Completed,
    Error,
    Terminated,
    Canceled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed
                | TaskStatus::Error
                | TaskStatus::Terminated
                | TaskStatus::Canceled
        )
    }
}

/// Lifecycle of a queue of tasks.
///
/// `Stopped` and `Timeout` are imposed from outside (stop request / daemon
/// sweep); the rest follow from the member tasks via the roll-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueStatus {
    Created,
    Processing,
    Completed,
    Stopped,
    Timeout,
    Error,
}

impl QueueStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QueueStatus::Completed
                | QueueStatus::Stopped
                | QueueStatus::Timeout
                | QueueStatus::Error
        )
    }
}

/// Lifecycle of a schedule; mirrors the owning queue per the reactor mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleStatus {
    Scheduled,
    Processing,
    Completed,
    Canceled,
    Timeout,
    Error,
}

impl ScheduleStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScheduleStatus::Completed
                | ScheduleStatus::Canceled
                | ScheduleStatus::Timeout
                | ScheduleStatus::Error
        )
    }
}
