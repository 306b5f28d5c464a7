// src/model/queue.rs

//! Queue rows: the unit of daemon dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::status::QueueStatus;
use crate::model::Id;

/// An ordered collection of tasks with a dispatch timer.
///
/// `timer = None` means "start as soon as the daemon sees it".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRow {
    pub id: Id,
    pub status: QueueStatus,
    pub timer: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
