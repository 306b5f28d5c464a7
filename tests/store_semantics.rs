//! Store discipline: idempotent setters, terminal protection, cascades,
//! change events.

mod common;

use streamrec::errors::RecorderError;
use streamrec::model::{NewChannel, QueueStatus, TaskStatus};
use streamrec::store::{ChangeKind, Entity, Store};
use streamrec_test_utils::builders::{seed_channel, ScheduleBuilder, TaskBuilder};

#[tokio::test]
async fn setting_the_same_status_twice_changes_nothing() {
    let store = common::store();
    let id = TaskBuilder::new("echo x").insert(store.as_ref());

    store.set_task_status(id, TaskStatus::Processing).unwrap();
    let after_first = store.task(id).unwrap();

    let mut rx = store.subscribe();
    store.set_task_status(id, TaskStatus::Processing).unwrap();
    let after_second = store.task(id).unwrap();

    assert_eq!(after_first, after_second);
    // The no-op write emitted no event.
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn terminal_statuses_are_not_overwritten() {
    let store = common::store();
    let id = TaskBuilder::new("echo x").insert(store.as_ref());

    store.set_task_status(id, TaskStatus::Completed).unwrap();
    store.set_task_status(id, TaskStatus::Error).unwrap();
    assert_eq!(store.task(id).unwrap().status, TaskStatus::Completed);
}

#[tokio::test]
async fn clear_resets_a_terminal_task() {
    let store = common::store();
    let id = TaskBuilder::new("echo x").insert(store.as_ref());

    store.set_task_status(id, TaskStatus::Processing).unwrap();
    store.set_task_pid(id, Some(12345)).unwrap();
    store.append_task_stdout(id, "hello\n").unwrap();
    store.set_task_status(id, TaskStatus::Error).unwrap();

    store.clear_task(id).unwrap();

    let task = store.task(id).unwrap();
    assert_eq!(task.status, TaskStatus::Created);
    assert_eq!(task.pid, None);
    assert!(task.stdout.is_empty());
    assert!(task.started_at.is_none() && task.ended_at.is_none());
}

#[tokio::test]
async fn clear_refuses_a_processing_task() {
    let store = common::store();
    let id = TaskBuilder::new("echo x").insert(store.as_ref());
    store.set_task_status(id, TaskStatus::Processing).unwrap();

    let err = store.clear_task(id).unwrap_err();
    assert!(matches!(err, RecorderError::Status(_)));
}

#[tokio::test]
async fn deleting_a_schedule_cascades_to_queue_and_tasks() {
    let store = common::store();
    let channel = seed_channel(store.as_ref(), "cascade");
    let schedule = ScheduleBuilder::new(channel).insert(store.as_ref());

    let queue = store.insert_queue(None).unwrap();
    let task = TaskBuilder::new("echo x").insert(store.as_ref());
    streamrec::engine::add_task(store.as_ref(), queue.id, task).unwrap();
    store.set_schedule_queue(schedule.id, queue.id).unwrap();

    store.delete_schedule(schedule.id).unwrap();

    assert!(matches!(
        store.queue(queue.id).unwrap_err(),
        RecorderError::NotFound { .. }
    ));
    assert!(matches!(
        store.task(task).unwrap_err(),
        RecorderError::NotFound { .. }
    ));
}

#[tokio::test]
async fn writes_emit_events_naming_their_fields() {
    let store = common::store();
    let mut rx = store.subscribe();

    let id = TaskBuilder::new("echo x").insert(store.as_ref());
    let created = rx.recv().await.unwrap();
    assert_eq!(created.entity, Entity::Task);
    assert_eq!(created.kind, ChangeKind::Created);
    assert_eq!(created.id, id);

    store.set_task_status(id, TaskStatus::Processing).unwrap();
    let updated = rx.recv().await.unwrap();
    assert_eq!(updated.kind, ChangeKind::Updated);
    assert_eq!(updated.changed_fields, vec!["status"]);

    store.append_task_stderr(id, "boom\n").unwrap();
    let appended = rx.recv().await.unwrap();
    assert_eq!(appended.changed_fields, vec!["stderr"]);
}

#[tokio::test]
async fn channel_validation_rejects_bad_rows() {
    let store = common::store();

    // Single-character name.
    let err = store
        .insert_channel(NewChannel {
            name: "x".to_string(),
            url: "http://ok.example/".to_string(),
            category: None,
        })
        .unwrap_err();
    assert!(matches!(err, RecorderError::Validation(_)));

    // Unparsable url.
    let err = store
        .insert_channel(NewChannel {
            name: "fine".to_string(),
            url: "not a url".to_string(),
            category: None,
        })
        .unwrap_err();
    assert!(matches!(err, RecorderError::Validation(_)));

    // Duplicate name.
    seed_channel(store.as_ref(), "dupe");
    let err = store
        .insert_channel(NewChannel {
            name: "dupe".to_string(),
            url: "http://ok.example/".to_string(),
            category: None,
        })
        .unwrap_err();
    assert!(matches!(err, RecorderError::Validation(_)));
}

#[tokio::test]
async fn terminate_flag_and_log_accumulate() {
    let store = common::store();
    let channel = seed_channel(store.as_ref(), "flags");
    let schedule = ScheduleBuilder::new(channel).insert(store.as_ref());

    assert!(!store.schedule(schedule.id).unwrap().terminate);
    store.request_schedule_terminate(schedule.id).unwrap();
    store.request_schedule_terminate(schedule.id).unwrap();
    assert!(store.schedule(schedule.id).unwrap().terminate);

    store.append_schedule_log(schedule.id, "first").unwrap();
    store.append_schedule_log(schedule.id, "second").unwrap();
    let log = store.schedule(schedule.id).unwrap().log;
    assert!(log.contains("first") && log.contains("second"));
}

#[tokio::test]
async fn queue_terminal_statuses_are_protected_too() {
    let store = common::store();
    let queue = store.insert_queue(None).unwrap();

    store
        .set_queue_status(queue.id, QueueStatus::Timeout)
        .unwrap();
    store
        .set_queue_status(queue.id, QueueStatus::Processing)
        .unwrap();
    assert_eq!(store.queue(queue.id).unwrap().status, QueueStatus::Timeout);
}
