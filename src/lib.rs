// src/lib.rs

pub mod cli;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod model;
pub mod proc;
pub mod reactor;
pub mod recorder;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::{CliArgs, CliCommand};
use crate::commands::AppContext;
use crate::config::loader::{default_config_path, load_and_validate, load_or_default};
use crate::errors::Result;
use crate::recorder::FfmpegCommands;
use crate::store::MemoryStore;

/// High-level entry point used by `main.rs`.
///
/// Loads the config, wires the store and command builder into an
/// [`AppContext`], and dispatches to the subcommand handlers.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args
        .config
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    // An explicitly named config must exist; the default location is
    // optional.
    let config = if args.config.is_some() {
        load_and_validate(&config_path)?
    } else {
        load_or_default(&config_path)?
    };

    let ctx = AppContext {
        store: Arc::new(MemoryStore::new()),
        commands: Arc::new(FfmpegCommands),
        config,
        config_path: args.config.clone(),
    };

    match args.command {
        CliCommand::Daemon { action } => commands::daemon::handle(&ctx, action).await,
        CliCommand::Record { action } => commands::record::handle(&ctx, action).await,
        CliCommand::Channel { action } => commands::channel::handle(&ctx, action).await,
    }
}
