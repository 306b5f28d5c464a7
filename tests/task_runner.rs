//! Task lifecycle: preconditions, observation loop, timeout, termination.

mod common;

use std::sync::Arc;

use streamrec::engine::{run_task, terminate_task};
use streamrec::errors::RecorderError;
use streamrec::model::{Hms, TaskStatus};
use streamrec::proc::pid::pid_exists;
use streamrec::store::Store;
use streamrec_test_utils::builders::TaskBuilder;

#[tokio::test]
async fn empty_command_is_rejected() {
    let store = common::store();
    let id = TaskBuilder::new("  ").insert(store.as_ref());

    let err = run_task(store.as_ref(), id, false).await.unwrap_err();
    assert!(matches!(err, RecorderError::Command(_)));
    // Nothing was persisted: the task is still runnable after fixing it.
    assert_eq!(store.task(id).unwrap().status, TaskStatus::Created);
}

#[tokio::test]
async fn unfinished_dependency_is_rejected() {
    let store = common::store();
    let dep = TaskBuilder::new("echo dep").insert(store.as_ref());
    let id = TaskBuilder::new("echo x")
        .depends_on(dep)
        .insert(store.as_ref());

    let err = run_task(store.as_ref(), id, false).await.unwrap_err();
    assert!(matches!(err, RecorderError::Dependence { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn non_created_task_is_rejected() {
    let store = common::store();
    let id = TaskBuilder::new("echo once").insert(store.as_ref());

    run_task(store.as_ref(), id, false).await.unwrap();
    assert_eq!(store.task(id).unwrap().status, TaskStatus::Completed);

    // Terminal states need an explicit clear before re-running.
    let err = run_task(store.as_ref(), id, false).await.unwrap_err();
    assert!(matches!(err, RecorderError::Status(_)));

    store.clear_task(id).unwrap();
    run_task(store.as_ref(), id, false).await.unwrap();
    assert_eq!(store.task(id).unwrap().status, TaskStatus::Completed);
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_run_records_everything() {
    let store = common::store();
    let id = TaskBuilder::new("echo out && echo err >&2").insert(store.as_ref());

    run_task(store.as_ref(), id, false).await.unwrap();

    let task = store.task(id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.pid.is_some());
    assert!(task.stdout.contains("out"));
    assert!(task.stderr.contains("err"));
    assert!(task.ended_at.unwrap() >= task.started_at.unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_run_with_check_raises_process_error() {
    let store = common::store();
    let id = TaskBuilder::new("exit 7").insert(store.as_ref());

    let err = run_task(store.as_ref(), id, true).await.unwrap_err();
    assert!(matches!(
        err,
        RecorderError::Process {
            status: TaskStatus::Error,
            ..
        }
    ));
    assert_eq!(store.task(id).unwrap().status, TaskStatus::Error);
}

#[tokio::test(flavor = "multi_thread")]
async fn timeout_terminates_a_running_task() {
    let store = common::store();
    let id = TaskBuilder::new("sleep 30")
        .timeout(Hms::new(0, 0, 1))
        .insert(store.as_ref());

    common::with_timeout(20, run_task(store.as_ref(), id, false))
        .await
        .unwrap();

    let task = store.task(id).unwrap();
    assert_eq!(task.status, TaskStatus::Terminated);
    assert!(task.ended_at.is_some());
    // The process did not outlive the task.
    assert!(!pid_exists(task.pid.unwrap()));
}

#[tokio::test(flavor = "multi_thread")]
async fn exit_in_the_timeout_tick_still_completes() {
    let store = common::store();
    // The process exits well inside the first second; the timeout fires on
    // the next tick and must defer to the natural exit.
    let id = TaskBuilder::new("sleep 0.2")
        .timeout(Hms::new(0, 0, 1))
        .insert(store.as_ref());

    common::with_timeout(20, run_task(store.as_ref(), id, false))
        .await
        .unwrap();

    assert_eq!(store.task(id).unwrap().status, TaskStatus::Completed);
}

#[tokio::test(flavor = "multi_thread")]
async fn terminate_task_stops_the_process() {
    let store = common::store();
    let id = TaskBuilder::new("sleep 30").insert(store.as_ref());

    let runner = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { run_task(store.as_ref(), id, false).await })
    };

    // Wait until the runner persisted a pid.
    let pid = common::with_timeout(10, async {
        loop {
            if let Some(pid) = store.task(id).unwrap().pid {
                break pid;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    })
    .await;

    terminate_task(store.as_ref(), id).await.unwrap();
    assert!(!pid_exists(pid));

    // The runner notices the dead process and leaves the Terminated status
    // alone (terminal states are never overwritten).
    common::with_timeout(20, runner).await.unwrap().unwrap();
    assert_eq!(store.task(id).unwrap().status, TaskStatus::Terminated);
}

#[tokio::test(flavor = "multi_thread")]
async fn terminate_task_without_a_process_is_idempotent() {
    let store = common::store();
    let id = TaskBuilder::new("echo x").insert(store.as_ref());

    terminate_task(store.as_ref(), id).await.unwrap();
    assert_eq!(store.task(id).unwrap().status, TaskStatus::Terminated);

    // Second call changes nothing.
    terminate_task(store.as_ref(), id).await.unwrap();
    assert_eq!(store.task(id).unwrap().status, TaskStatus::Terminated);
}

#[tokio::test(flavor = "multi_thread")]
async fn externally_terminated_row_stops_the_process() {
    let store = common::store();
    let id = TaskBuilder::new("sleep 60").insert(store.as_ref());

    let runner = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { run_task(store.as_ref(), id, false).await })
    };

    // Let the task reach Processing, then flip the row the way an external
    // controller (queue stop) would.
    common::with_timeout(10, async {
        while store.task(id).unwrap().status != TaskStatus::Processing {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    })
    .await;
    store.set_task_status(id, TaskStatus::Terminated).unwrap();

    // The observation loop re-reads the row every ten ticks.
    common::with_timeout(30, runner).await.unwrap().unwrap();

    let task = store.task(id).unwrap();
    assert_eq!(task.status, TaskStatus::Terminated);
    assert!(!pid_exists(task.pid.unwrap()));
}
