//! Format descriptions handed to the capture engine.
//!
//! A [`CaptureConfiguration`] bundles the container, screen video, cursor and
//! audio formats of one recording. It is validated when built and cannot be
//! changed afterwards.

use crate::error::Result;
use crate::validation;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIME_AVI: &str = "video/avi";
pub const ENCODING_AVI_TECHSMITH_SCREEN_CAPTURE: &str = "tscc";
pub const ENCODING_BLACK_CURSOR: &str = "black";
pub const ENCODING_WHITE_CURSOR: &str = "white";

/// Frames per second of the screen track.
pub const DEFAULT_FRAME_RATE: u32 = 15;
/// One key frame per minute of video.
pub const DEFAULT_KEY_FRAME_INTERVAL: u32 = DEFAULT_FRAME_RATE * 60;
pub const DEFAULT_DEPTH: u8 = 24;
pub const DEFAULT_QUALITY: f32 = 1.0;
pub const DEFAULT_CURSOR_FRAME_RATE: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    pub num: u32,
    pub den: u32,
}

impl Rational {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    pub const fn from_integer(value: u32) -> Self {
        Self { num: value, den: 1 }
    }

    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        self.num as f64 / self.den as f64
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    File,
    Video,
    Audio,
}

/// Container of the produced files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFormat {
    pub mime_type: String,
}

impl FileFormat {
    pub fn media_type(&self) -> MediaType {
        MediaType::File
    }

    /// File extension used for files in this container.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            MIME_AVI => "avi",
            _ => "bin",
        }
    }
}

/// Screen track parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFormat {
    pub encoding: String,
    pub compressor_name: String,
    pub depth: u8,
    pub frame_rate: Rational,
    /// 0.0 (smallest) to 1.0 (lossless where the codec allows it)
    pub quality: f32,
    /// Distance between key frames, in frames
    pub key_frame_interval: u32,
}

impl VideoFormat {
    pub fn media_type(&self) -> MediaType {
        MediaType::Video
    }

    pub fn is_lossless(&self) -> bool {
        self.quality >= 1.0
    }
}

/// How the mouse pointer is rendered into the captured frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorFormat {
    pub encoding: String,
    pub frame_rate: Rational,
}

impl CursorFormat {
    pub fn media_type(&self) -> MediaType {
        MediaType::Video
    }

    pub fn draws_pointer(&self) -> bool {
        matches!(
            self.encoding.as_str(),
            ENCODING_BLACK_CURSOR | ENCODING_WHITE_CURSOR
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_size_in_bits: u16,
}

impl AudioFormat {
    pub fn media_type(&self) -> MediaType {
        MediaType::Audio
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            sample_size_in_bits: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfiguration {
    file_format: FileFormat,
    video_format: VideoFormat,
    cursor_format: Option<CursorFormat>,
    audio_format: Option<AudioFormat>,
}

impl CaptureConfiguration {
    pub fn new(
        file_format: FileFormat,
        video_format: VideoFormat,
        cursor_format: Option<CursorFormat>,
        audio_format: Option<AudioFormat>,
    ) -> Result<Self> {
        validation::validate_mime_type(&file_format.mime_type)?;
        validation::validate_depth(video_format.depth)?;
        validation::validate_frame_rate(video_format.frame_rate)?;
        validation::validate_quality(video_format.quality)?;
        validation::validate_key_frame_interval(video_format.key_frame_interval)?;
        if let Some(cursor) = &cursor_format {
            validation::validate_frame_rate(cursor.frame_rate)?;
        }

        Ok(Self {
            file_format,
            video_format,
            cursor_format,
            audio_format,
        })
    }

    /// The fixed screen recording setup: TechSmith screen capture video in an
    /// AVI container, 24 bit, 15 fps, full quality, a key frame every 60
    /// seconds, black pointer sampled at 30 fps, no audio.
    pub fn screen_recording() -> Self {
        Self {
            file_format: FileFormat {
                mime_type: MIME_AVI.to_string(),
            },
            video_format: VideoFormat {
                encoding: ENCODING_AVI_TECHSMITH_SCREEN_CAPTURE.to_string(),
                compressor_name: ENCODING_AVI_TECHSMITH_SCREEN_CAPTURE.to_string(),
                depth: DEFAULT_DEPTH,
                frame_rate: Rational::from_integer(DEFAULT_FRAME_RATE),
                quality: DEFAULT_QUALITY,
                key_frame_interval: DEFAULT_KEY_FRAME_INTERVAL,
            },
            cursor_format: Some(CursorFormat {
                encoding: ENCODING_BLACK_CURSOR.to_string(),
                frame_rate: Rational::from_integer(DEFAULT_CURSOR_FRAME_RATE),
            }),
            audio_format: None,
        }
    }

    /// Same setup with an audio track added.
    pub fn with_audio(self, audio_format: AudioFormat) -> Self {
        Self {
            audio_format: Some(audio_format),
            ..self
        }
    }

    pub fn file_format(&self) -> &FileFormat {
        &self.file_format
    }

    pub fn video_format(&self) -> &VideoFormat {
        &self.video_format
    }

    pub fn cursor_format(&self) -> Option<&CursorFormat> {
        self.cursor_format.as_ref()
    }

    pub fn audio_format(&self) -> Option<&AudioFormat> {
        self.audio_format.as_ref()
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self::screen_recording()
    }
}
