use std::path::Path;

use streamrec::model::{Hms, ResizeSpec};
use streamrec::recorder::CommandBuilder;

/// A command builder that emits plain shell one-liners instead of `ffmpeg`
/// invocations, so supervisor tests run real processes without the media
/// tool installed.
///
/// - `record` produces a command that sleeps for `record_secs` and exits 0
///   (or a custom template when given).
/// - `resize` copies the input placeholder to the output.
pub struct FakeCommands {
    /// Overrides the generated record command when set. `{out}` is replaced
    /// with the output path.
    pub record_template: Option<String>,
    /// How long the default record command sleeps.
    pub record_secs: u64,
}

impl Default for FakeCommands {
    fn default() -> Self {
        Self {
            record_template: None,
            record_secs: 1,
        }
    }
}

impl FakeCommands {
    pub fn sleeping(record_secs: u64) -> Self {
        Self {
            record_template: None,
            record_secs,
        }
    }

    pub fn with_record(template: &str) -> Self {
        Self {
            record_template: Some(template.to_string()),
            record_secs: 0,
        }
    }
}

impl CommandBuilder for FakeCommands {
    fn record(&self, _url: &str, output: &Path, _duration: Hms) -> String {
        match &self.record_template {
            Some(template) => template.replace("{out}", &output.display().to_string()),
            None => format!("sleep {}", self.record_secs),
        }
    }

    fn resize(&self, input: &Path, output: &Path, _spec: ResizeSpec) -> String {
        format!("cp {} {}", input.display(), output.display())
    }
}
