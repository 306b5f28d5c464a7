// src/logging.rs

//! Tracing setup shared by the CLI and the daemon.
//!
//! One subscriber, human-readable lines on stderr (stdout stays free for
//! tables and status output). The filter is resolved from, in order of
//! precedence: the `--log-level` flag, the `STREAMREC_LOG` environment
//! variable, then `info`. The environment variable takes full `EnvFilter`
//! directives, so a stuck recording can be chased with e.g.
//! `STREAMREC_LOG=streamrec::recorder=trace,info`.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

const FILTER_ENV: &str = "STREAMREC_LOG";

/// Install the global subscriber. Call once, before any worker spawns.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    fmt()
        .with_env_filter(resolve_filter(cli_level))
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    Ok(())
}

/// An explicit `--log-level` beats the environment; an unset or unparsable
/// environment falls back to `info`.
fn resolve_filter(cli_level: Option<LogLevel>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.as_directive());
    }

    EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}
