// src/model/schedule.rs

//! Schedules: user intent to record a channel for a duration at a time.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::status::ScheduleStatus;
use crate::model::time::Hms;
use crate::model::Id;

/// `force_original_aspect_ratio` qualifier for the resize filter.
///
/// Carried through as opaque data; the values map to the ffmpeg filter words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Foar {
    Disable,
    Decrease,
    Increase,
}

impl Default for Foar {
    fn default() -> Self {
        Foar::Disable
    }
}

impl Foar {
    pub fn as_filter_word(self) -> &'static str {
        match self {
            Foar::Disable => "disable",
            Foar::Decrease => "decrease",
            Foar::Increase => "increase",
        }
    }
}

/// Optional post-record resize step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSpec {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub foar: Foar,
}

/// A scheduled recording.
///
/// `terminate` is the persisted cancellation flag: any controller (CLI, admin
/// UI) may set it, and the running supervisor picks it up on its next poll.
/// `log` is append-only free text; the supervisor writes a timestamped entry
/// for every status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Id,
    pub channel: Id,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub duration: Hms,
    pub status: ScheduleStatus,
    pub queue: Option<Id>,
    pub resize: Option<ResizeSpec>,
    pub user: String,
    pub file: Option<PathBuf>,
    pub pid: Option<u32>,
    pub terminate: bool,
    pub log: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    /// Scheduled end of the recording window.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + self.duration.to_chrono()
    }

    /// True once the scheduled start is in the past.
    pub fn is_passed(&self) -> bool {
        self.start_time <= Utc::now()
    }
}

/// Insert payload for a schedule.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub channel: Id,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub duration: Hms,
    pub resize: Option<ResizeSpec>,
    pub user: String,
}
