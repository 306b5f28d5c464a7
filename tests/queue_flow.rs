//! Queue execution: ordering, dependency pulling, failure roll-up.

mod common;

use streamrec::engine::{add_task, calculate_queue_status, roll_up, start_queue, stop_queue};
use streamrec::errors::RecorderError;
use streamrec::model::{QueueStatus, TaskStatus};
use streamrec::store::Store;
use streamrec_test_utils::builders::TaskBuilder;

#[tokio::test(flavor = "multi_thread")]
async fn dependent_tasks_complete_in_order() {
    let store = common::store();

    let queue = store.insert_queue(None).unwrap();
    let t1 = TaskBuilder::new("echo A").insert(store.as_ref());
    let t2 = TaskBuilder::new("echo B")
        .depends_on(t1)
        .insert(store.as_ref());

    add_task(store.as_ref(), queue.id, t1).unwrap();
    add_task(store.as_ref(), queue.id, t2).unwrap();

    start_queue(store.as_ref(), queue.id).await.unwrap();

    let t1 = store.task(t1).unwrap();
    let t2 = store.task(t2).unwrap();
    assert_eq!(t1.status, TaskStatus::Completed);
    assert_eq!(t2.status, TaskStatus::Completed);
    assert_eq!(store.queue(queue.id).unwrap().status, QueueStatus::Completed);

    // The first task finished before the second began.
    assert!(t1.ended_at.unwrap() <= t2.started_at.unwrap());
    assert!(t1.ended_at.unwrap() >= t1.started_at.unwrap());

    // The first task's output was captured.
    assert!(t1.stdout.contains('A'));
}

#[tokio::test]
async fn adding_a_leaf_pulls_its_ancestors_first() {
    let store = common::store();

    let queue = store.insert_queue(None).unwrap();
    let t1 = TaskBuilder::new("echo 1").insert(store.as_ref());
    let t2 = TaskBuilder::new("echo 2")
        .depends_on(t1)
        .insert(store.as_ref());
    let t3 = TaskBuilder::new("echo 3")
        .depends_on(t2)
        .insert(store.as_ref());

    // Only the leaf is added explicitly.
    add_task(store.as_ref(), queue.id, t3).unwrap();

    let members: Vec<_> = store
        .tasks_in_queue(queue.id)
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(members, vec![t1, t2, t3]);

    let lines: Vec<_> = store
        .tasks_in_queue(queue.id)
        .iter()
        .map(|t| t.line)
        .collect();
    assert_eq!(lines, vec![1, 2, 3]);
}

#[tokio::test]
async fn re_adding_a_task_is_a_no_op() {
    let store = common::store();

    let queue = store.insert_queue(None).unwrap();
    let t1 = TaskBuilder::new("echo 1").insert(store.as_ref());

    add_task(store.as_ref(), queue.id, t1).unwrap();
    add_task(store.as_ref(), queue.id, t1).unwrap();

    assert_eq!(store.tasks_in_queue(queue.id).len(), 1);
}

#[tokio::test]
async fn adding_to_a_started_queue_is_rejected() {
    let store = common::store();

    let queue = store.insert_queue(None).unwrap();
    store
        .set_queue_status(queue.id, QueueStatus::Processing)
        .unwrap();

    let t1 = TaskBuilder::new("echo 1").insert(store.as_ref());
    let err = add_task(store.as_ref(), queue.id, t1).unwrap_err();
    assert!(matches!(err, RecorderError::Status(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_task_surfaces_as_error_queue() {
    let store = common::store();

    let queue = store.insert_queue(None).unwrap();
    let t1 = TaskBuilder::new("echo X && exit 1").insert(store.as_ref());
    add_task(store.as_ref(), queue.id, t1).unwrap();

    start_queue(store.as_ref(), queue.id).await.unwrap();

    assert_eq!(store.task(t1).unwrap().status, TaskStatus::Error);
    assert_eq!(store.queue(queue.id).unwrap().status, QueueStatus::Error);
}

#[tokio::test(flavor = "multi_thread")]
async fn dependent_of_failed_task_is_skipped() {
    let store = common::store();

    let queue = store.insert_queue(None).unwrap();
    let t1 = TaskBuilder::new("exit 1").insert(store.as_ref());
    let t2 = TaskBuilder::new("echo never")
        .depends_on(t1)
        .insert(store.as_ref());
    add_task(store.as_ref(), queue.id, t2).unwrap();

    start_queue(store.as_ref(), queue.id).await.unwrap();

    assert_eq!(store.task(t1).unwrap().status, TaskStatus::Error);
    // The dependent never ran.
    assert_eq!(store.task(t2).unwrap().status, TaskStatus::Created);
    assert_eq!(store.queue(queue.id).unwrap().status, QueueStatus::Error);
}

#[tokio::test]
async fn empty_queue_start_is_a_warned_no_op() {
    let store = common::store();

    let queue = store.insert_queue(None).unwrap();
    start_queue(store.as_ref(), queue.id).await.unwrap();

    assert_eq!(store.queue(queue.id).unwrap().status, QueueStatus::Created);
}

#[tokio::test]
async fn stop_terminates_processing_tasks() {
    let store = common::store();

    let queue = store.insert_queue(None).unwrap();
    let t1 = TaskBuilder::new("echo 1").insert(store.as_ref());
    let t2 = TaskBuilder::new("echo 2").insert(store.as_ref());
    add_task(store.as_ref(), queue.id, t1).unwrap();
    add_task(store.as_ref(), queue.id, t2).unwrap();

    store.set_task_status(t1, TaskStatus::Processing).unwrap();

    stop_queue(store.as_ref(), queue.id).unwrap();

    assert_eq!(store.task(t1).unwrap().status, TaskStatus::Terminated);
    // Tasks that never started are left alone.
    assert_eq!(store.task(t2).unwrap().status, TaskStatus::Created);
    assert_eq!(store.queue(queue.id).unwrap().status, QueueStatus::Stopped);
}

#[tokio::test]
async fn roll_up_follows_member_statuses() {
    let store = common::store();

    let queue = store.insert_queue(None).unwrap();
    let t1 = TaskBuilder::new("echo 1").insert(store.as_ref());
    let t2 = TaskBuilder::new("echo 2").insert(store.as_ref());
    add_task(store.as_ref(), queue.id, t1).unwrap();
    add_task(store.as_ref(), queue.id, t2).unwrap();

    // All Created: undetermined, status untouched.
    assert_eq!(
        calculate_queue_status(store.as_ref(), queue.id).unwrap(),
        QueueStatus::Created
    );

    store.set_task_status(t1, TaskStatus::Processing).unwrap();
    assert_eq!(
        calculate_queue_status(store.as_ref(), queue.id).unwrap(),
        QueueStatus::Processing
    );

    store.set_task_status(t1, TaskStatus::Completed).unwrap();
    store.set_task_status(t2, TaskStatus::Completed).unwrap();
    assert_eq!(
        calculate_queue_status(store.as_ref(), queue.id).unwrap(),
        QueueStatus::Completed
    );

    // Error dominates everything else.
    let tasks = store.tasks_in_queue(queue.id);
    let mut with_error = tasks.clone();
    with_error[0].status = TaskStatus::Error;
    assert_eq!(roll_up(&with_error), Some(QueueStatus::Error));

    // An empty member list never determines a status.
    assert_eq!(roll_up(&[]), None);
}
