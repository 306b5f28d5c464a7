#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use streamrec::model::{Hms, Id, NewChannel, NewSchedule, NewTask, ResizeSpec, Schedule};
use streamrec::store::Store;

/// Insert a channel with a throwaway url; returns its id.
pub fn seed_channel(store: &dyn Store, name: &str) -> Id {
    store
        .insert_channel(NewChannel {
            name: name.to_string(),
            url: format!("http://stream.example/{name}"),
            category: None,
        })
        .expect("Failed to insert channel")
        .id
}

/// Builder for `NewSchedule` with test-friendly defaults: a one-minute
/// recording starting now.
pub struct ScheduleBuilder {
    channel: Id,
    name: String,
    start_time: DateTime<Utc>,
    duration: Hms,
    resize: Option<ResizeSpec>,
}

impl ScheduleBuilder {
    pub fn new(channel: Id) -> Self {
        Self {
            channel,
            name: "test record".to_string(),
            start_time: Utc::now(),
            duration: Hms::new(0, 1, 0),
            resize: None,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn starting_in(mut self, seconds: i64) -> Self {
        self.start_time = Utc::now() + Duration::seconds(seconds);
        self
    }

    pub fn started_ago(mut self, seconds: i64) -> Self {
        self.start_time = Utc::now() - Duration::seconds(seconds);
        self
    }

    pub fn duration(mut self, duration: Hms) -> Self {
        self.duration = duration;
        self
    }

    pub fn resize(mut self, width: u32, height: u32) -> Self {
        self.resize = Some(ResizeSpec {
            width,
            height,
            foar: Default::default(),
        });
        self
    }

    pub fn insert(self, store: &dyn Store) -> Schedule {
        store
            .insert_schedule(NewSchedule {
                channel: self.channel,
                name: self.name,
                start_time: self.start_time,
                duration: self.duration,
                resize: self.resize,
                user: "tester".to_string(),
            })
            .expect("Failed to insert schedule")
    }
}

/// Builder for `NewTask`.
pub struct TaskBuilder {
    task: NewTask,
}

impl TaskBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            task: NewTask {
                name: None,
                depends_on: None,
                timeout: None,
                command: command.to_string(),
                output: None,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.task.name = Some(name.to_string());
        self
    }

    pub fn depends_on(mut self, dep: Id) -> Self {
        self.task.depends_on = Some(dep);
        self
    }

    pub fn timeout(mut self, timeout: Hms) -> Self {
        self.task.timeout = Some(timeout);
        self
    }

    pub fn insert(self, store: &dyn Store) -> Id {
        store
            .insert_task(self.task)
            .expect("Failed to insert task")
            .id
    }
}
