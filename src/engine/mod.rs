//! Capture engines.
//!
//! A [`CaptureEngine`] does the actual screen grabbing, encoding and muxing.
//! Sessions only ever talk to this trait; [`FfmpegEngine`] is the bundled
//! implementation and drives an `ffmpeg` child process.

mod args;
mod encoder;
mod ffmpeg;
mod output;

pub use args::FfmpegCommandBuilder;
pub use encoder::{select_encoder, Compression, EncoderInfo};
pub use ffmpeg::FfmpegEngine;
pub use output::OutputPlan;

use crate::error::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Files are split once they hold this much video.
pub const DEFAULT_MAX_FILE_DURATION: Duration = Duration::from_secs(60 * 60);
/// How long a freshly spawned engine must survive before start succeeds.
pub const DEFAULT_STARTUP_GRACE: Duration = Duration::from_millis(500);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

pub trait CaptureEngine: Send {
    /// Begin recording. Engine resources stay allocated until `stop`.
    fn start(&mut self) -> Result<()>;

    /// End recording and finalize every output file.
    fn stop(&mut self) -> Result<()>;

    /// Files produced by the last recording, in the order they were written.
    fn created_files(&self) -> Vec<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub ffmpeg_path: Option<PathBuf>,
    /// Defaults to the user's video directory
    pub output_dir: Option<PathBuf>,
    /// `None` writes a single file regardless of length
    pub max_file_duration: Option<Duration>,
    /// Input device for the audio track, where the platform needs one
    pub audio_device: Option<String>,
    pub startup_grace: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            output_dir: None,
            max_file_duration: Some(DEFAULT_MAX_FILE_DURATION),
            audio_device: None,
            startup_grace: DEFAULT_STARTUP_GRACE,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl EngineOptions {
    /// Where recordings land when no directory is configured.
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(dirs::video_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
