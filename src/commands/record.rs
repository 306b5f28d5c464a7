// src/commands/record.rs

//! `streamrec record {list|start|stop|check-timeout}`.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::cli::{RecordAction, StatusFilter};
use crate::commands::{render_table, AppContext};
use crate::daemon::sweep_schedule_timeouts;
use crate::errors::{RecorderError, Result};
use crate::model::{Id, Schedule, ScheduleStatus};
use crate::recorder::Supervisor;

pub async fn handle(ctx: &AppContext, action: RecordAction) -> Result<()> {
    match action {
        RecordAction::List { statuses, count } => list(ctx, &statuses, count),
        RecordAction::Start { id, now } => start(ctx, id, now).await,
        RecordAction::Stop { id } => stop(ctx, id),
        RecordAction::CheckTimeout { dry_run } => check_timeout(ctx, dry_run),
    }
}

fn list(ctx: &AppContext, statuses: &[StatusFilter], count: usize) -> Result<()> {
    let filter: Option<HashSet<ScheduleStatus>> = if statuses.is_empty()
        || statuses.contains(&StatusFilter::All)
    {
        None
    } else {
        Some(statuses.iter().filter_map(|s| s.as_status()).collect())
    };

    let mut records: Vec<Schedule> = ctx
        .store
        .schedules()
        .into_iter()
        .filter(|s| filter.as_ref().is_none_or(|f| f.contains(&s.status)))
        .collect();
    records.sort_by_key(|s| s.start_time);

    let total = records.len();
    let shown = total.min(count);

    println!(
        "Server Time: {}, Total Items: {}, Shown: {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        total,
        shown
    );

    let rows: Vec<Vec<String>> = records
        .iter()
        .take(count)
        .map(|s| record_row(ctx, s))
        .collect();
    print!(
        "{}",
        render_table(
            &["id", "Name", "Channel", "Status", "Start Time", "Duration"],
            &rows
        )
    );
    Ok(())
}

fn record_row(ctx: &AppContext, s: &Schedule) -> Vec<String> {
    let channel = ctx
        .store
        .channel(s.channel)
        .map(|c| c.name)
        .unwrap_or_default();
    vec![
        s.id.to_string(),
        s.name.clone(),
        channel,
        format!("{:?}", s.status),
        s.start_time.format("%Y-%m-%d %H:%M:%S").to_string(),
        s.duration.to_string(),
    ]
}

/// Run one recording in the foreground.
///
/// Without `--now` only Scheduled (or Error, for a retry) records are
/// accepted and the supervisor waits for the start time; `--now` skips both.
async fn start(ctx: &AppContext, id: Id, now: bool) -> Result<()> {
    let rcd = ctx.store.schedule(id)?;

    if rcd.status == ScheduleStatus::Processing {
        println!("Record already started.");
        return Ok(());
    }

    if !now && !matches!(rcd.status, ScheduleStatus::Scheduled | ScheduleStatus::Error) {
        println!("Record is not scheduled (use --now to force).");
        return Err(RecorderError::Status(format!(
            "record {id} is {:?}, not Scheduled",
            rcd.status
        )));
    }

    if !now && rcd.is_passed() {
        println!("Record start time has passed (use --now to force).");
        return Err(RecorderError::Status(format!(
            "record {id} was scheduled for {}",
            rcd.start_time
        )));
    }

    let channel = ctx.store.channel(rcd.channel)?;
    println!("Record Starting: {} - {} - {}", rcd.id, rcd.name, channel.name);

    let supervisor = Supervisor::new(
        Arc::clone(&ctx.store),
        Arc::clone(&ctx.commands),
        ctx.config.video_dir(),
        id,
        ctx.config.supervisor_config(!now),
    );
    supervisor.run().await?;

    match ctx.store.schedule(id)?.status {
        ScheduleStatus::Completed => println!("Record completed."),
        status => println!("Record ended as {status:?}."),
    }
    Ok(())
}

/// Request termination; the running supervisor picks the flag up on its next
/// poll.
fn stop(ctx: &AppContext, id: Id) -> Result<()> {
    let rcd = ctx.store.schedule(id)?;

    if rcd.status != ScheduleStatus::Processing {
        println!("Record not running");
        return Ok(());
    }

    ctx.store.request_schedule_terminate(id)?;
    println!("Stop requested");
    Ok(())
}

fn check_timeout(ctx: &AppContext, dry_run: bool) -> Result<()> {
    let swept = sweep_schedule_timeouts(ctx.store.as_ref(), dry_run)?;
    if dry_run {
        println!("Timeout Records: {} found, none updated.", swept.len());
    } else {
        println!(
            "Timeout Records: {} found, {} updated.",
            swept.len(),
            swept.len()
        );
    }
    Ok(())
}
