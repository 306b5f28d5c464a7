// src/commands/mod.rs

//! CLI command handlers.
//!
//! Each handler takes the shared [`AppContext`] (store, command builder,
//! validated config) and one parsed subcommand. Human-facing output goes to
//! stdout; diagnostics go through `tracing`.

pub mod channel;
pub mod daemon;
pub mod record;

use std::sync::Arc;

use crate::config::ConfigFile;
use crate::recorder::CommandBuilder;
use crate::store::Store;

/// Everything a command handler needs.
pub struct AppContext {
    pub store: Arc<dyn Store>,
    pub commands: Arc<dyn CommandBuilder>,
    pub config: ConfigFile,
    /// The `--config` value as typed, forwarded to the detached daemon child.
    pub config_path: Option<String>,
}

/// Render a plain fixed-width table.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() && cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let mut out = String::new();

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<width$}", h, width = widths[i]))
        .collect();
    out.push_str(&header_line.join(" | "));
    out.push('\n');

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:<width$}", c, width = widths.get(i).copied().unwrap_or(0)))
            .collect();
        out.push_str(&cells.join(" | "));
        out.push('\n');
    }

    out
}
