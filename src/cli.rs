// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::model::{Id, ScheduleStatus};

/// Command-line arguments for `streamrec`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "streamrec",
    version,
    about = "Record IPTV streams on a timed schedule.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `STREAMREC_CONFIG` or `Streamrec.toml` in the current
    /// working directory; missing file means built-in defaults.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STREAMREC_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Control the background daemon.
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// List, start, stop and sweep recordings.
    Record {
        #[command(subcommand)]
        action: RecordAction,
    },
    /// Administer the channel registry.
    Channel {
        #[command(subcommand)]
        action: ChannelAction,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum DaemonAction {
    /// Start the daemon as a detached background process.
    Start,
    /// Stop a running daemon.
    Stop,
    /// Stop (if running) and start again.
    Restart,
    /// Show whether the daemon is running.
    Status,
    /// Run the daemon loop in the foreground (used by `start` internally).
    #[command(hide = true)]
    Run,
}

#[derive(Debug, Clone, Subcommand)]
pub enum RecordAction {
    /// Tabular listing of recordings, optionally filtered by status.
    List {
        /// Status filters; no filter (or `all`) lists everything.
        #[arg(value_enum)]
        statuses: Vec<StatusFilter>,

        /// How many items will be shown.
        #[arg(long, default_value_t = 20)]
        count: usize,
    },
    /// Start one recording in the foreground.
    Start {
        id: Id,

        /// Skip the scheduled-time check and record immediately.
        #[arg(long)]
        now: bool,
    },
    /// Request termination of a running recording.
    Stop { id: Id },
    /// Sweep past-due scheduled recordings into Timeout.
    CheckTimeout {
        /// Only report what would change.
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ChannelAction {
    /// Add (or update) a channel.
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        url: String,

        /// Category name to attach.
        #[arg(long)]
        category: Option<String>,

        /// Create the category when it does not exist yet.
        #[arg(long)]
        create_category: bool,

        /// Update url/category when the channel already exists.
        #[arg(long)]
        update: bool,
    },
    /// Add a category.
    AddCategory {
        #[arg(long)]
        name: String,
    },
    /// List channels.
    List {
        #[arg(long, default_value_t = 20)]
        count: usize,
    },
    /// List categories.
    ListCategories {
        #[arg(long, default_value_t = 20)]
        count: usize,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The `EnvFilter` directive this level stands for.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Status filter for `record list`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    All,
    Scheduled,
    Processing,
    Completed,
    Canceled,
    Timeout,
    Error,
}

impl StatusFilter {
    /// The schedule status this filter selects; `All` selects everything.
    pub fn as_status(self) -> Option<ScheduleStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Scheduled => Some(ScheduleStatus::Scheduled),
            StatusFilter::Processing => Some(ScheduleStatus::Processing),
            StatusFilter::Completed => Some(ScheduleStatus::Completed),
            StatusFilter::Canceled => Some(ScheduleStatus::Canceled),
            StatusFilter::Timeout => Some(ScheduleStatus::Timeout),
            StatusFilter::Error => Some(ScheduleStatus::Error),
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
