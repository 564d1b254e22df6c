use crate::error::{CaptureError, Result};
use crate::format::{VideoFormat, ENCODING_AVI_TECHSMITH_SCREEN_CAPTURE};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Lossless,
    Lossy,
}

/// Encoder backend identification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderInfo {
    pub name: String,
    pub compression: Compression,
    pub priority: u8, // Lower is higher priority
}

impl EncoderInfo {
    fn new(name: &str, compression: Compression, priority: u8) -> Self {
        Self {
            name: name.to_string(),
            compression,
            priority,
        }
    }

    /// Pixel format handed to the encoder for the requested color depth.
    pub fn pixel_format(&self, depth: u8) -> &'static str {
        match (self.name.as_str(), depth) {
            ("zmbv", 8) => "pal8",
            ("zmbv", 16) => "rgb565le",
            ("zmbv", _) => "bgr0",
            ("ffv1", 8) => "gray",
            ("ffv1", _) => "bgr0",
            ("rawvideo", 8) => "pal8",
            ("rawvideo", 16) => "rgb555le",
            ("rawvideo", 32) => "bgra",
            ("rawvideo", _) => "bgr24",
            ("png", 32) => "rgba",
            ("png", _) => "rgb24",
            _ => "yuvj420p",
        }
    }

    /// Extra encoder arguments derived from the 0.0..=1.0 quality setting.
    /// Lossless encoders ignore it.
    pub fn quality_args(&self, quality: f32) -> Vec<String> {
        match self.compression {
            Compression::Lossless => Vec::new(),
            Compression::Lossy => vec!["-q:v".to_string(), quality_to_qscale(quality).to_string()],
        }
    }
}

/// Map quality (1.0 best) onto ffmpeg's qscale range 2..=31.
fn quality_to_qscale(quality: f32) -> u8 {
    let q = quality.clamp(0.0, 1.0);
    (2.0 + ((1.0 - q) * 29.0).round()) as u8
}

/// Encoders able to stand in for a requested encoding, best first.
///
/// TechSmith screen capture has no ffmpeg encoder; the zlib based lossless
/// screen codecs are the closest match and also play back from AVI.
fn encoder_priority_list(encoding: &str) -> Vec<EncoderInfo> {
    match encoding {
        ENCODING_AVI_TECHSMITH_SCREEN_CAPTURE => vec![
            EncoderInfo::new("zmbv", Compression::Lossless, 0),
            EncoderInfo::new("ffv1", Compression::Lossless, 1),
            EncoderInfo::new("rawvideo", Compression::Lossless, 10),
        ],
        "MJPG" | "mjpg" => vec![EncoderInfo::new("mjpeg", Compression::Lossy, 0)],
        "png" => vec![EncoderInfo::new("png", Compression::Lossless, 0)],
        "raw" | "DIB " => vec![EncoderInfo::new("rawvideo", Compression::Lossless, 0)],
        other => vec![EncoderInfo::new(other, Compression::Lossy, 0)],
    }
}

/// Pick the first encoder for `format` that the ffmpeg build provides.
pub fn select_encoder(format: &VideoFormat, available: &HashSet<String>) -> Result<EncoderInfo> {
    let candidates = encoder_priority_list(&format.encoding);
    let tried: Vec<String> = candidates.iter().map(|e| e.name.clone()).collect();

    for encoder in candidates {
        if available.contains(&encoder.name) {
            log::debug!(
                "Encoding '{}' mapped to encoder '{}' ({:?})",
                format.encoding,
                encoder.name,
                encoder.compression
            );
            return Ok(encoder);
        }
        log::debug!("Encoder '{}' not available", encoder.name);
    }

    Err(CaptureError::ConfigurationError(format!(
        "No encoder available for '{}'. Tried: {:?}",
        format.encoding, tried
    )))
}
