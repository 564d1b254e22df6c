use crate::error::{CaptureError, Result};
use crate::format::{Rational, MIME_AVI};
use std::path::Path;

pub const MAX_FRAME_RATE: f64 = 120.0;
pub const SUPPORTED_DEPTHS: [u8; 4] = [8, 16, 24, 32];

pub fn validate_frame_rate(rate: Rational) -> Result<()> {
    if rate.num == 0 || rate.den == 0 {
        return Err(CaptureError::ConfigurationError(format!(
            "Invalid frame rate {}: numerator and denominator must be positive",
            rate
        )));
    }
    if rate.as_f64() > MAX_FRAME_RATE {
        return Err(CaptureError::ConfigurationError(format!(
            "Invalid frame rate {}: must be at most {} fps",
            rate, MAX_FRAME_RATE
        )));
    }
    Ok(())
}

pub fn validate_quality(quality: f32) -> Result<()> {
    if !quality.is_finite() || !(0.0..=1.0).contains(&quality) {
        return Err(CaptureError::ConfigurationError(format!(
            "Invalid quality {}: must be between 0.0 and 1.0",
            quality
        )));
    }
    Ok(())
}

pub fn validate_depth(depth: u8) -> Result<()> {
    if !SUPPORTED_DEPTHS.contains(&depth) {
        return Err(CaptureError::ConfigurationError(format!(
            "Invalid color depth {}: expected one of {:?}",
            depth, SUPPORTED_DEPTHS
        )));
    }
    Ok(())
}

pub fn validate_key_frame_interval(interval: u32) -> Result<()> {
    if interval == 0 {
        return Err(CaptureError::ConfigurationError(
            "Key frame interval must be at least one frame".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_mime_type(mime_type: &str) -> Result<()> {
    if mime_type != MIME_AVI {
        return Err(CaptureError::ConfigurationError(format!(
            "Unsupported container {}: only {} is supported",
            mime_type, MIME_AVI
        )));
    }
    Ok(())
}

/// Checks that `dir` is, or can become, a directory for output files.
pub fn validate_output_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(CaptureError::io(format!(
            "Output path is not a directory: {}",
            dir.display()
        )));
    }

    // Walk up to the first existing ancestor; it must be a directory
    let mut ancestor = dir.parent();
    while let Some(p) = ancestor {
        if p.as_os_str().is_empty() || p.exists() {
            break;
        }
        ancestor = p.parent();
    }
    if let Some(p) = ancestor {
        if !p.as_os_str().is_empty() && !p.is_dir() {
            return Err(CaptureError::io(format!(
                "Output path parent is not a directory: {}",
                p.display()
            )));
        }
    }

    Ok(())
}
