// src/commands/daemon.rs

//! `streamrec daemon {start|stop|restart|status|run}`.
//!
//! `start` spawns the current executable with the hidden `run` subcommand as
//! a detached child, so the shell gets its prompt back while the loop keeps
//! going; the runfile/pidfile pair carries the lock semantics either way.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::cli::DaemonAction;
use crate::commands::AppContext;
use crate::daemon::{Daemon, Lockfiles};
use crate::errors::{RecorderError, Result};

/// How long `start` waits before checking that the child came up.
const STARTUP_GRACE: Duration = Duration::from_millis(500);

pub async fn handle(ctx: &AppContext, action: DaemonAction) -> Result<()> {
    match action {
        DaemonAction::Start => start(ctx).await,
        DaemonAction::Stop => stop(ctx).await,
        DaemonAction::Restart => restart(ctx).await,
        DaemonAction::Status => status(ctx),
        DaemonAction::Run => run(ctx).await,
    }
}

fn lockfiles(ctx: &AppContext) -> Lockfiles {
    Lockfiles::new(ctx.config.base_dir())
}

async fn start(ctx: &AppContext) -> Result<()> {
    let locks = lockfiles(ctx);
    if locks.pidfile().exists() {
        println!("Daemon: Already Running");
        return Err(RecorderError::DaemonRunning);
    }

    spawn_detached(ctx)?;
    tokio::time::sleep(STARTUP_GRACE).await;

    if locks.is_running() {
        println!("Daemon: Started");
        Ok(())
    } else {
        println!("Daemon: Could not be started");
        Err(RecorderError::Daemon("daemon did not come up".to_string()))
    }
}

/// Spawn `streamrec daemon run` detached from this terminal.
fn spawn_detached(ctx: &AppContext) -> Result<()> {
    let exe = std::env::current_exe().context("resolving current executable")?;

    let mut cmd = std::process::Command::new(exe);
    cmd.arg("daemon").arg("run");
    if let Some(path) = &ctx.config_path {
        cmd.arg("--config").arg(path);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let child = cmd.spawn().map_err(RecorderError::Spawn)?;
    info!(pid = child.id(), "daemon child spawned");
    Ok(())
}

async fn stop(ctx: &AppContext) -> Result<()> {
    let daemon = Daemon::new(
        Arc::clone(&ctx.store),
        ctx.config.base_dir(),
        ctx.config.daemon_config(),
    );

    match daemon.stop().await {
        Ok(()) => {
            println!("Daemon: Stopped");
            Ok(())
        }
        Err(RecorderError::DaemonNotRunning) => {
            println!("Daemon: Not Running");
            Err(RecorderError::DaemonNotRunning)
        }
        Err(e) => Err(e),
    }
}

async fn restart(ctx: &AppContext) -> Result<()> {
    if lockfiles(ctx).pidfile().exists() {
        stop(ctx).await?;
    }
    start(ctx).await
}

fn status(ctx: &AppContext) -> Result<()> {
    if lockfiles(ctx).is_running() {
        println!("Daemon: Running");
    } else {
        println!("Daemon: Stopped");
    }
    Ok(())
}

/// Foreground loop: the reactor plus the daemon itself.
async fn run(ctx: &AppContext) -> Result<()> {
    let _reactor = crate::reactor::spawn(
        Arc::clone(&ctx.store),
        Arc::clone(&ctx.commands),
        ctx.config.video_dir(),
    );

    let mut daemon = Daemon::new(
        Arc::clone(&ctx.store),
        ctx.config.base_dir(),
        ctx.config.daemon_config(),
    );
    daemon.start().await
}
