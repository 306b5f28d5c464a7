// src/recorder/command.rs

//! Media-tool command construction.
//!
//! The rest of the system treats commands as opaque shell strings; this trait
//! is the only place that knows the tool's syntax. Tests swap in a builder
//! that returns plain shell one-liners.

use std::path::Path;

use crate::model::{Hms, ResizeSpec};
use crate::model::schedule::Foar;

pub trait CommandBuilder: Send + Sync + 'static {
    /// Command that records a stream url into `output` for `duration`.
    fn record(&self, url: &str, output: &Path, duration: Hms) -> String;

    /// Command that rescales `input` into `output`.
    fn resize(&self, input: &Path, output: &Path, spec: ResizeSpec) -> String;
}

/// Production builder producing `ffmpeg` invocations.
///
/// Record: stream copy with the AAC ADTS-to-ASC bitstream filter and an
/// explicit duration bound. Resize: a `scale` video filter, optionally
/// qualified with `force_original_aspect_ratio`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegCommands;

impl CommandBuilder for FfmpegCommands {
    fn record(&self, url: &str, output: &Path, duration: Hms) -> String {
        format!(
            "ffmpeg -v error -i '{url}' -y -c copy -bsf:a aac_adtstoasc -t {duration} {}",
            output.display()
        )
    }

    fn resize(&self, input: &Path, output: &Path, spec: ResizeSpec) -> String {
        let mut filter = format!("scale={}x{}", spec.width, spec.height);
        if spec.foar != Foar::Disable {
            filter.push_str(":force_original_aspect_ratio=");
            filter.push_str(spec.foar.as_filter_word());
        }
        format!(
            "ffmpeg -v error -i {} -filter:v {filter} -y {}",
            input.display(),
            output.display()
        )
    }
}
