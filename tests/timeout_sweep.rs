//! Past-due sweep: Scheduled records whose start time has passed move to
//! Timeout.

mod common;

use streamrec::daemon::sweep_schedule_timeouts;
use streamrec::model::ScheduleStatus;
use streamrec::store::Store;
use streamrec_test_utils::builders::{seed_channel, ScheduleBuilder};

#[tokio::test]
async fn past_due_records_are_swept() {
    let store = common::store();
    let channel = seed_channel(store.as_ref(), "sweep");

    let past: Vec<_> = (0..3)
        .map(|i| {
            ScheduleBuilder::new(channel)
                .name(&format!("missed {i}"))
                .started_ago(60)
                .insert(store.as_ref())
        })
        .collect();
    let future = ScheduleBuilder::new(channel)
        .name("still fine")
        .starting_in(3600)
        .insert(store.as_ref());

    let swept = sweep_schedule_timeouts(store.as_ref(), false).unwrap();
    assert_eq!(swept.len(), 3);

    for s in &past {
        assert_eq!(
            store.schedule(s.id).unwrap().status,
            ScheduleStatus::Timeout
        );
    }
    assert_eq!(
        store.schedule(future.id).unwrap().status,
        ScheduleStatus::Scheduled
    );
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
    let store = common::store();
    let channel = seed_channel(store.as_ref(), "dry");

    let s = ScheduleBuilder::new(channel)
        .started_ago(60)
        .insert(store.as_ref());

    let swept = sweep_schedule_timeouts(store.as_ref(), true).unwrap();
    assert_eq!(swept, vec![s.id]);
    assert_eq!(
        store.schedule(s.id).unwrap().status,
        ScheduleStatus::Scheduled
    );
}

#[tokio::test]
async fn non_scheduled_records_are_ignored() {
    let store = common::store();
    let channel = seed_channel(store.as_ref(), "done");

    let s = ScheduleBuilder::new(channel)
        .started_ago(60)
        .insert(store.as_ref());
    store
        .set_schedule_status(s.id, ScheduleStatus::Completed)
        .unwrap();

    let swept = sweep_schedule_timeouts(store.as_ref(), false).unwrap();
    assert!(swept.is_empty());
    assert_eq!(
        store.schedule(s.id).unwrap().status,
        ScheduleStatus::Completed
    );
}
