// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Ordered roughly by specificity: daemon lifecycle preconditions first, then
//! task/queue state errors, then process-level failures. `Other` keeps
//! `anyhow` available for context-wrapping at the CLI shell.

use thiserror::Error;

use crate::model::{Id, TaskStatus};

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("daemon is already running")]
    DaemonRunning,

    #[error("daemon is not running")]
    DaemonNotRunning,

    #[error("daemon failed: {0}")]
    Daemon(String),

    #[error("illegal status transition: {0}")]
    Status(String),

    #[error("task {task} depends on task {depends_on} which is {status:?}, not Completed")]
    Dependence {
        task: Id,
        depends_on: Id,
        status: TaskStatus,
    },

    #[error("dependency of task {task} on task {depends_on} would create a cycle")]
    DependenceCycle { task: Id, depends_on: Id },

    #[error("task {0} has no command")]
    Command(Id),

    #[error("process for task {task} ended as {status:?}")]
    Process { task: Id, status: TaskStatus },

    #[error("could not spawn process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Id },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RecorderError>;
