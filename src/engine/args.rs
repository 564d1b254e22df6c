use crate::display_info::DisplayTarget;
use crate::format::{AudioFormat, Rational};
use std::time::Duration;

/// Builds the ffmpeg argument list for one capture.
#[derive(Debug, Clone)]
pub struct FfmpegCommandBuilder {
    display: DisplayTarget,
    display_env: Option<String>,
    framerate: Rational,
    draw_mouse: bool,
    audio: Option<AudioFormat>,
    audio_device: Option<String>,
    video_codec: String,
    pixel_format: String,
    key_frame_interval: u32,
    quality_args: Vec<String>,
    segment_time: Option<Duration>,
    segment_list: Option<String>,
    output_path: String,
}

impl FfmpegCommandBuilder {
    pub fn new(display: DisplayTarget, output_path: String) -> Self {
        Self {
            display,
            display_env: std::env::var("DISPLAY").ok().filter(|d| !d.is_empty()),
            framerate: Rational::from_integer(15),
            draw_mouse: true,
            audio: None,
            audio_device: None,
            video_codec: "rawvideo".to_string(),
            pixel_format: "bgr24".to_string(),
            key_frame_interval: 900,
            quality_args: Vec::new(),
            segment_time: None,
            segment_list: None,
            output_path,
        }
    }

    /// X11 display to grab from instead of `$DISPLAY`.
    pub fn with_display_env(mut self, display: Option<String>) -> Self {
        self.display_env = display;
        self
    }

    pub fn with_framerate(mut self, framerate: Rational) -> Self {
        self.framerate = framerate;
        self
    }

    pub fn with_draw_mouse(mut self, draw_mouse: bool) -> Self {
        self.draw_mouse = draw_mouse;
        self
    }

    pub fn with_audio(mut self, audio: Option<AudioFormat>, device: Option<String>) -> Self {
        self.audio = audio;
        self.audio_device = device;
        self
    }

    pub fn with_video_codec(mut self, codec: String, pixel_format: String) -> Self {
        self.video_codec = codec;
        self.pixel_format = pixel_format;
        self
    }

    pub fn with_key_frame_interval(mut self, interval: u32) -> Self {
        self.key_frame_interval = interval;
        self
    }

    pub fn with_quality_args(mut self, args: Vec<String>) -> Self {
        self.quality_args = args;
        self
    }

    /// Split the output every `segment_time`, listing finished files in
    /// `segment_list`. `output_path` must then be a `%03d` pattern. Splits
    /// happen on the first key frame after the limit.
    pub fn with_segments(mut self, segment_time: Duration, segment_list: String) -> Self {
        self.segment_time = Some(segment_time);
        self.segment_list = Some(segment_list);
        self
    }

    pub fn build(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-nostats", "-loglevel", "warning"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        self.push_video_input(&mut args);
        self.push_audio_input(&mut args);

        args.extend([
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-g".to_string(),
            self.key_frame_interval.to_string(),
        ]);
        args.extend(self.quality_args.iter().cloned());

        if let Some(audio) = &self.audio {
            let codec = if audio.sample_size_in_bits <= 8 {
                "pcm_u8"
            } else {
                "pcm_s16le"
            };
            args.extend([
                "-c:a".to_string(),
                codec.to_string(),
                "-ar".to_string(),
                audio.sample_rate.to_string(),
                "-ac".to_string(),
                audio.channels.to_string(),
            ]);
        }

        match (&self.segment_time, &self.segment_list) {
            (Some(segment_time), Some(segment_list)) => {
                let secs = format_seconds(*segment_time);
                args.extend([
                    "-f".to_string(),
                    "segment".to_string(),
                    "-segment_format".to_string(),
                    "avi".to_string(),
                    "-segment_time".to_string(),
                    secs,
                    "-segment_start_number".to_string(),
                    "1".to_string(),
                    "-segment_list".to_string(),
                    segment_list.clone(),
                    "-segment_list_type".to_string(),
                    "flat".to_string(),
                    "-reset_timestamps".to_string(),
                    "1".to_string(),
                ]);
            }
            _ => {
                args.extend(["-f".to_string(), "avi".to_string(), "-y".to_string()]);
            }
        }

        args.push(self.output_path.clone());
        args
    }

    fn push_video_input(&self, args: &mut Vec<String>) {
        let framerate = self.framerate.to_string();

        let (index, origin, size) = match &self.display {
            DisplayTarget::TestPattern { width, height } => {
                args.extend([
                    "-re".to_string(),
                    "-f".to_string(),
                    "lavfi".to_string(),
                    "-i".to_string(),
                    format!("testsrc=size={}x{}:rate={}", width, height, framerate),
                ]);
                return;
            }
            DisplayTarget::Screen {
                index,
                origin,
                size,
            } => (*index, *origin, *size),
        };

        cfg_if::cfg_if! {
            if #[cfg(target_os = "macos")] {
                let _ = (origin, size);
                args.extend([
                    "-f".to_string(),
                    "avfoundation".to_string(),
                    "-capture_cursor".to_string(),
                    bool_flag(self.draw_mouse),
                    "-framerate".to_string(),
                    framerate,
                    "-i".to_string(),
                    format!("Capture screen {}:none", index),
                ]);
            } else if #[cfg(target_os = "windows")] {
                let _ = index;
                args.extend([
                    "-f".to_string(),
                    "gdigrab".to_string(),
                    "-draw_mouse".to_string(),
                    bool_flag(self.draw_mouse),
                    "-framerate".to_string(),
                    framerate,
                ]);
                if let Some((w, h)) = size {
                    args.extend([
                        "-offset_x".to_string(),
                        origin.0.to_string(),
                        "-offset_y".to_string(),
                        origin.1.to_string(),
                        "-video_size".to_string(),
                        format!("{}x{}", w, h),
                    ]);
                }
                args.push("-i".to_string());
                args.push("desktop".to_string());
            } else {
                args.extend([
                    "-f".to_string(),
                    "x11grab".to_string(),
                    "-draw_mouse".to_string(),
                    bool_flag(self.draw_mouse),
                    "-framerate".to_string(),
                    framerate,
                ]);
                if let Some((w, h)) = size {
                    args.push("-video_size".to_string());
                    args.push(format!("{}x{}", w, h));
                }
                // Monitors share one X screen; pick one by its offset
                let _ = index;
                let display = self.display_env.clone().unwrap_or_else(|| ":0".to_string());
                let input = if size.is_some() && origin != (0, 0) {
                    format!("{}+{},{}", display, origin.0, origin.1)
                } else {
                    display
                };
                args.push("-i".to_string());
                args.push(input);
            }
        }
    }

    fn push_audio_input(&self, args: &mut Vec<String>) {
        let Some(audio) = &self.audio else {
            return;
        };

        if self.display.is_test_pattern() {
            args.extend([
                "-f".to_string(),
                "lavfi".to_string(),
                "-i".to_string(),
                format!("sine=frequency=440:sample_rate={}", audio.sample_rate),
            ]);
            return;
        }

        cfg_if::cfg_if! {
            if #[cfg(target_os = "macos")] {
                let device = self.audio_device.clone().unwrap_or_else(|| "0".to_string());
                args.extend([
                    "-f".to_string(),
                    "avfoundation".to_string(),
                    "-i".to_string(),
                    format!(":{}", device),
                ]);
            } else if #[cfg(target_os = "windows")] {
                let device = self.audio_device.clone().unwrap_or_default();
                args.extend([
                    "-f".to_string(),
                    "dshow".to_string(),
                    "-i".to_string(),
                    format!("audio={}", device),
                ]);
            } else {
                let device = self.audio_device.clone().unwrap_or_else(|| "default".to_string());
                args.extend([
                    "-f".to_string(),
                    "pulse".to_string(),
                    "-i".to_string(),
                    device,
                ]);
            }
        }
    }
}

fn bool_flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn format_seconds(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        duration.as_secs().to_string()
    } else {
        format!("{:.3}", duration.as_secs_f64())
    }
}
