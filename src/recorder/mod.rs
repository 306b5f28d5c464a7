// src/recorder/mod.rs

//! Record-specific supervision.
//!
//! - [`command`] builds the opaque media-tool command strings (and is the
//!   seam tests use to substitute harmless shell commands).
//! - [`output`] manages placeholder media files under `<base>/videos/`.
//! - [`supervisor`] is the long-running per-record supervisor: start-time
//!   wait, duration overrun enforcement, persisted-terminate polling.

pub mod command;
pub mod output;
pub mod supervisor;

pub use command::{CommandBuilder, FfmpegCommands};
pub use supervisor::{Supervisor, SupervisorConfig};
