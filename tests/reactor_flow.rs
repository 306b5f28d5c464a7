//! Reactor behaviour: queue construction on schedule creation, status
//! mirroring from queue to schedule.

mod common;

use std::sync::Arc;
use std::time::Duration;

use streamrec::model::{Hms, QueueStatus, ScheduleStatus, TaskStatus};
use streamrec::store::Store;
use streamrec_test_utils::builders::{seed_channel, ScheduleBuilder};
use streamrec_test_utils::fake_commands::FakeCommands;

async fn eventually<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn schedule_creation_builds_its_queue() {
    let store = common::store();
    let dir = tempfile::tempdir().unwrap();
    let _reactor = streamrec::reactor::spawn(
        store.clone(),
        Arc::new(FakeCommands::default()),
        dir.path().to_path_buf(),
    );

    let channel = seed_channel(store.as_ref(), "news");
    let schedule = ScheduleBuilder::new(channel)
        .starting_in(3600)
        .duration(Hms::new(0, 30, 0))
        .resize(640, 480)
        .insert(store.as_ref());

    eventually("queue hung off the schedule", || {
        store.schedule(schedule.id).unwrap().queue.is_some()
    })
    .await;

    let queue_id = store.schedule(schedule.id).unwrap().queue.unwrap();
    let queue = store.queue(queue_id).unwrap();
    assert_eq!(queue.status, QueueStatus::Created);
    assert_eq!(queue.timer, Some(schedule.start_time));

    let tasks = store.tasks_in_queue(queue_id);
    assert_eq!(tasks.len(), 2);

    let record = &tasks[0];
    let resize = &tasks[1];
    assert_eq!(record.name.as_deref(), Some("record"));
    assert_eq!(resize.name.as_deref(), Some("resize"));
    assert_eq!(resize.depends_on, Some(record.id));
    assert!(record.line < resize.line);

    // Record timeout = duration + one minute of slack.
    assert_eq!(record.timeout, Some(Hms::new(0, 31, 0)));

    // Both placeholders exist on disk already.
    assert!(record.output.as_ref().unwrap().exists());
    assert!(resize.output.as_ref().unwrap().exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn schedule_without_resize_gets_one_task() {
    let store = common::store();
    let dir = tempfile::tempdir().unwrap();
    let _reactor = streamrec::reactor::spawn(
        store.clone(),
        Arc::new(FakeCommands::default()),
        dir.path().to_path_buf(),
    );

    let channel = seed_channel(store.as_ref(), "plain");
    let schedule = ScheduleBuilder::new(channel).insert(store.as_ref());

    eventually("queue hung off the schedule", || {
        store.schedule(schedule.id).unwrap().queue.is_some()
    })
    .await;

    let queue_id = store.schedule(schedule.id).unwrap().queue.unwrap();
    assert_eq!(store.tasks_in_queue(queue_id).len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn task_completion_flows_up_to_the_schedule() {
    let store = common::store();
    let dir = tempfile::tempdir().unwrap();
    let _reactor = streamrec::reactor::spawn(
        store.clone(),
        Arc::new(FakeCommands::default()),
        dir.path().to_path_buf(),
    );

    let channel = seed_channel(store.as_ref(), "flow");
    let schedule = ScheduleBuilder::new(channel).insert(store.as_ref());

    eventually("queue hung off the schedule", || {
        store.schedule(schedule.id).unwrap().queue.is_some()
    })
    .await;
    let queue_id = store.schedule(schedule.id).unwrap().queue.unwrap();
    let task = store.tasks_in_queue(queue_id)[0].clone();

    // Worker-style writes: Processing first...
    store
        .set_task_status(task.id, TaskStatus::Processing)
        .unwrap();
    eventually("schedule mirrors Processing", || {
        store.schedule(schedule.id).unwrap().status == ScheduleStatus::Processing
    })
    .await;

    // ...then Completed; the mirror publishes the last task's output.
    store
        .set_task_status(task.id, TaskStatus::Completed)
        .unwrap();
    eventually("schedule mirrors Completed", || {
        store.schedule(schedule.id).unwrap().status == ScheduleStatus::Completed
    })
    .await;
    assert_eq!(
        store.schedule(schedule.id).unwrap().file,
        task.output.clone()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn stopped_queue_mirrors_as_canceled() {
    let store = common::store();
    let dir = tempfile::tempdir().unwrap();
    let _reactor = streamrec::reactor::spawn(
        store.clone(),
        Arc::new(FakeCommands::default()),
        dir.path().to_path_buf(),
    );

    let channel = seed_channel(store.as_ref(), "cancelme");
    let schedule = ScheduleBuilder::new(channel).insert(store.as_ref());

    eventually("queue hung off the schedule", || {
        store.schedule(schedule.id).unwrap().queue.is_some()
    })
    .await;
    let queue_id = store.schedule(schedule.id).unwrap().queue.unwrap();

    streamrec::engine::stop_queue(store.as_ref(), queue_id).unwrap();

    eventually("schedule mirrors Canceled", || {
        store.schedule(schedule.id).unwrap().status == ScheduleStatus::Canceled
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn timeout_queue_mirrors_as_timeout() {
    let store = common::store();
    let dir = tempfile::tempdir().unwrap();
    let _reactor = streamrec::reactor::spawn(
        store.clone(),
        Arc::new(FakeCommands::default()),
        dir.path().to_path_buf(),
    );

    let channel = seed_channel(store.as_ref(), "late");
    let schedule = ScheduleBuilder::new(channel).insert(store.as_ref());

    eventually("queue hung off the schedule", || {
        store.schedule(schedule.id).unwrap().queue.is_some()
    })
    .await;
    let queue_id = store.schedule(schedule.id).unwrap().queue.unwrap();

    // What the daemon does to an overshot timer.
    store
        .set_queue_status(queue_id, QueueStatus::Timeout)
        .unwrap();

    eventually("schedule mirrors Timeout", || {
        store.schedule(schedule.id).unwrap().status == ScheduleStatus::Timeout
    })
    .await;
}
