//! ffmpeg subprocess engine
//!
//! The screen is grabbed, encoded and muxed by an `ffmpeg` child process.
//! Starting spawns it, stopping asks it to quit with `q` on stdin so the
//! AVI index and trailer get written, and kills it only if it hangs.

use super::args::FfmpegCommandBuilder;
use super::encoder::{select_encoder, EncoderInfo};
use super::output::OutputPlan;
use super::{CaptureEngine, EngineOptions};
use crate::display_info::DisplayTarget;
use crate::error::{CaptureError, Result};
use crate::ffmpeg_utils;
use crate::format::{CaptureConfiguration, Rational};
use crate::validation;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Lines of ffmpeg's stderr kept for error reports
const STDERR_TAIL_LINES: usize = 20;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct FfmpegEngine {
    ffmpeg_path: PathBuf,
    display: DisplayTarget,
    config: CaptureConfiguration,
    encoder: EncoderInfo,
    options: EngineOptions,
    output_dir: PathBuf,
    running: Option<RunningCapture>,
    created_files: Vec<PathBuf>,
}

struct RunningCapture {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_rx: Receiver<String>,
    stderr_pump: Option<JoinHandle<()>>,
    plan: OutputPlan,
    started_at: Instant,
}

impl RunningCapture {
    /// Wait for the stderr pump to finish and return the last lines it saw.
    fn stderr_tail(&mut self) -> String {
        if let Some(pump) = self.stderr_pump.take() {
            let _ = pump.join();
        }
        let lines: Vec<String> = self.stderr_rx.try_iter().collect();
        lines.join("\n")
    }

    fn wait_with_timeout(&mut self, timeout: Duration) -> Result<Option<ExitStatus>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn kill(&mut self) {
        if let Err(e) = self.child.kill() {
            log::warn!("Failed to kill ffmpeg (pid {}): {}", self.child.id(), e);
        }
        let _ = self.child.wait();
    }
}

impl FfmpegEngine {
    /// Prepare an engine for `display` with the formats of `config`.
    ///
    /// Locates ffmpeg and picks an encoder up front so that a missing or
    /// unsuitable installation is reported as a configuration problem rather
    /// than at `start`. The output directory is only touched by `start`.
    pub fn create(
        display: DisplayTarget,
        config: &CaptureConfiguration,
        options: EngineOptions,
    ) -> Result<Self> {
        let ffmpeg_path = ffmpeg_utils::find_ffmpeg_binary(options.ffmpeg_path.as_deref())?;
        let version = ffmpeg_utils::validate_ffmpeg(&ffmpeg_path)?;
        let available = ffmpeg_utils::list_encoders(&ffmpeg_path)?;
        let encoder = select_encoder(config.video_format(), &available)?;

        if config.audio_format().is_some()
            && !display.is_test_pattern()
            && cfg!(target_os = "windows")
            && options.audio_device.is_none()
        {
            return Err(CaptureError::ConfigurationError(
                "Audio capture on Windows needs an audio device name".to_string(),
            ));
        }

        let output_dir = options.resolved_output_dir();

        log::info!("Capture engine ready: {}", version);
        log::info!("  Source: {}", display);
        log::info!(
            "  Video: {} via {} ({:?}), {} bit @ {} fps",
            config.video_format().encoding,
            encoder.name,
            encoder.compression,
            config.video_format().depth,
            config.video_format().frame_rate
        );
        log::info!("  Output directory: {}", output_dir.display());

        Ok(Self {
            ffmpeg_path,
            display,
            config: config.clone(),
            encoder,
            options,
            output_dir,
            running: None,
            created_files: Vec::new(),
        })
    }

    pub fn encoder(&self) -> &EncoderInfo {
        &self.encoder
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn is_recording(&self) -> bool {
        self.running.is_some()
    }

    fn command_args(&self, plan: &OutputPlan) -> Vec<String> {
        let video = self.config.video_format();
        let draw_mouse = self
            .config
            .cursor_format()
            .map(|c| c.draws_pointer())
            .unwrap_or(false);

        let output = if plan.is_segmented() {
            plan.segment_pattern()
        } else {
            plan.single_file().to_string_lossy().into_owned()
        };

        let mut builder = FfmpegCommandBuilder::new(self.display.clone(), output)
            .with_framerate(video.frame_rate)
            .with_draw_mouse(draw_mouse)
            .with_audio(
                self.config.audio_format().cloned(),
                self.options.audio_device.clone(),
            )
            .with_video_codec(
                self.encoder.name.clone(),
                self.encoder.pixel_format(video.depth).to_string(),
            )
            .with_key_frame_interval(key_frame_interval(
                video.key_frame_interval,
                video.frame_rate,
                self.options.max_file_duration,
            ))
            .with_quality_args(self.encoder.quality_args(video.quality));

        if let Some(segment_time) = self.options.max_file_duration {
            builder = builder.with_segments(
                segment_time,
                plan.segment_list().to_string_lossy().into_owned(),
            );
        }

        builder.build()
    }

    fn spawn(&self, args: &[String]) -> std::io::Result<Child> {
        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Keep terminal interrupts away from ffmpeg; shutdown goes through stdin
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        command.spawn()
    }
}

/// Files can only be split on a key frame, so files shorter than the
/// configured key frame distance need key frames at least once per file.
fn key_frame_interval(configured: u32, frame_rate: Rational, max_file: Option<Duration>) -> u32 {
    match max_file {
        Some(limit) => {
            let frames_per_file = (limit.as_secs_f64() * frame_rate.as_f64()).floor().max(1.0);
            configured.min(frames_per_file as u32)
        }
        None => configured,
    }
}

/// Queue `line`, dropping the oldest queued line when the tail is full.
fn push_tail(tx: &Sender<String>, rx: &Receiver<String>, mut line: String) {
    loop {
        match tx.try_send(line) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => return,
            Err(TrySendError::Full(rejected)) => {
                let _ = rx.try_recv();
                line = rejected;
            }
        }
    }
}

fn pump_stderr(child: &mut Child) -> (Receiver<String>, Option<JoinHandle<()>>) {
    let (tx, rx): (Sender<String>, Receiver<String>) =
        crossbeam_channel::bounded(STDERR_TAIL_LINES);
    let tail = rx.clone();
    let handle = child.stderr.take().map(|stderr| {
        thread::spawn(move || {
            let reader = BufReader::new(stderr);
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        log::debug!("[ffmpeg] {}", line);
                        push_tail(&tx, &tail, line);
                    }
                    Err(e) => {
                        log::warn!("[ffmpeg] failed to read line: {}", e);
                        break;
                    }
                }
            }
        })
    });
    (rx, handle)
}

fn failure(message: String, tail: &str) -> CaptureError {
    if tail.is_empty() {
        CaptureError::io(message)
    } else {
        CaptureError::io(format!("{}\n{}", message, tail))
    }
}

impl CaptureEngine for FfmpegEngine {
    fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(CaptureError::EngineError(
                "Capture is already running".to_string(),
            ));
        }

        // An unusable output directory is reported here, as an I/O error
        validation::validate_output_dir(&self.output_dir)?;
        let plan = OutputPlan::reserve(
            &self.output_dir,
            self.config.file_format().extension(),
            self.options.max_file_duration.is_some(),
        )?;
        let args = self.command_args(&plan);
        log::debug!("Spawning FFmpeg with args: {:?}", args);

        let mut child = match self.spawn(&args) {
            Ok(child) => child,
            Err(e) => {
                plan.release();
                return Err(CaptureError::IoError(std::io::Error::new(
                    e.kind(),
                    format!("Failed to spawn {}: {}", self.ffmpeg_path.display(), e),
                )));
            }
        };

        let stdin = child.stdin.take();
        let (stderr_rx, stderr_pump) = pump_stderr(&mut child);
        let mut running = RunningCapture {
            child,
            stdin,
            stderr_rx,
            stderr_pump,
            plan,
            started_at: Instant::now(),
        };

        // ffmpeg reports unusable inputs and unwritable outputs right away
        if let Some(status) = running.wait_with_timeout(self.options.startup_grace)? {
            let tail = running.stderr_tail();
            for file in running.plan.produced_files().unwrap_or_default() {
                let _ = std::fs::remove_file(file);
            }
            running.plan.release();
            return Err(failure(
                format!("ffmpeg exited during startup ({})", status),
                &tail,
            ));
        }

        log::info!(
            "Recording started (pid {}) -> {}",
            running.child.id(),
            running.plan.dir().join(running.plan.stem()).display()
        );
        self.created_files.clear();
        self.running = Some(running);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut running = self.running.take().ok_or_else(|| {
            CaptureError::EngineError("Capture is not running".to_string())
        })?;

        log::info!(
            "Stopping recording after {:.1}s",
            running.started_at.elapsed().as_secs_f64()
        );

        if let Some(mut stdin) = running.stdin.take() {
            if let Err(e) = stdin.write_all(b"q").and_then(|_| stdin.flush()) {
                log::warn!("Failed to send 'q' to ffmpeg: {}", e);
            }
        }

        let status = match running.wait_with_timeout(self.options.shutdown_timeout) {
            Ok(status) => status,
            Err(e) => {
                running.kill();
                running.plan.release();
                return Err(e);
            }
        };

        let outcome = match status {
            Some(status) if status.success() => Ok(()),
            Some(status) => {
                let tail = running.stderr_tail();
                Err(failure(format!("ffmpeg failed to finalize ({})", status), &tail))
            }
            None => {
                log::warn!(
                    "ffmpeg did not exit within {:?}, killing process",
                    self.options.shutdown_timeout
                );
                running.kill();
                let tail = running.stderr_tail();
                Err(failure(
                    "ffmpeg did not finish writing the recording in time".to_string(),
                    &tail,
                ))
            }
        };

        let produced = running.plan.produced_files();
        running.plan.release();
        // Make sure the pump thread is gone before returning
        running.stderr_tail();
        outcome?;

        let files = produced?;
        if files.is_empty() {
            return Err(CaptureError::io(format!(
                "ffmpeg exited without producing a recording in {}",
                running.plan.dir().display()
            )));
        }

        self.created_files = files;
        Ok(())
    }

    fn created_files(&self) -> Vec<PathBuf> {
        self.created_files.clone()
    }
}

impl Drop for FfmpegEngine {
    fn drop(&mut self) {
        if let Some(mut running) = self.running.take() {
            log::warn!("Capture engine dropped while recording, killing ffmpeg");
            running.kill();
            running.plan.release();
        }
    }
}
