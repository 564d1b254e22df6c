use crate::error::{CaptureError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable overriding the ffmpeg binary location
pub const FFMPEG_ENV_VAR: &str = "SCREENREC_FFMPEG";

/// Finds the FFmpeg binary: explicit path first, then `SCREENREC_FFMPEG`,
/// then the system PATH.
pub fn find_ffmpeg_binary(provided_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = provided_path {
        if !path.exists() {
            return Err(CaptureError::ConfigurationError(format!(
                "FFmpeg binary not found at provided path: {}",
                path.display()
            )));
        }

        log::info!("Using provided FFmpeg binary: {}", path.display());
        return Ok(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os(FFMPEG_ENV_VAR).filter(|p| !p.is_empty()) {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(CaptureError::ConfigurationError(format!(
                "{} points to a missing file: {}",
                FFMPEG_ENV_VAR,
                path.display()
            )));
        }
        log::info!("Using FFmpeg binary from {}: {}", FFMPEG_ENV_VAR, path.display());
        return Ok(path);
    }

    log::debug!("No FFmpeg path provided, searching system PATH...");

    match which_command("ffmpeg") {
        Some(path) => {
            log::debug!("Found FFmpeg in system: {}", path.display());
            Ok(path)
        }
        None => Err(CaptureError::ConfigurationError(
            "FFmpeg not found. Please install FFmpeg or provide --ffmpeg-path argument.\n\
             \n\
             Installation instructions:\n\
               macOS:    brew install ffmpeg\n\
               Ubuntu:   sudo apt-get install ffmpeg\n\
               Windows:  Download from https://ffmpeg.org/download.html"
                .to_string(),
        )),
    }
}

/// Generic function to find a command in system PATH
fn which_command(command: &str) -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let which_cmd = "where";
    #[cfg(not(target_os = "windows"))]
    let which_cmd = "which";

    Command::new(which_cmd)
        .arg(command)
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().lines().next().unwrap_or("").to_string())
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
            } else {
                None
            }
        })
}

/// Validates that FFmpeg is working by running -version
pub fn validate_ffmpeg(ffmpeg_path: &Path) -> Result<String> {
    match Command::new(ffmpeg_path).arg("-version").output() {
        Ok(output) => {
            if output.status.success() {
                let version_info = String::from_utf8_lossy(&output.stdout);
                let first_line = version_info
                    .lines()
                    .next()
                    .unwrap_or("Unknown version")
                    .to_string();

                log::debug!("FFmpeg validation successful: {}", first_line);
                Ok(first_line)
            } else {
                Err(CaptureError::ConfigurationError(format!(
                    "FFmpeg validation failed: {}",
                    String::from_utf8_lossy(&output.stderr)
                )))
            }
        }
        Err(e) => Err(CaptureError::ConfigurationError(format!(
            "Failed to execute FFmpeg: {}",
            e
        ))),
    }
}

/// Names of the encoders compiled into the given ffmpeg.
pub fn list_encoders(ffmpeg_path: &Path) -> Result<HashSet<String>> {
    let output = Command::new(ffmpeg_path)
        .args(["-hide_banner", "-encoders"])
        .output()
        .map_err(|e| {
            CaptureError::ConfigurationError(format!("Failed to run ffmpeg -encoders: {}", e))
        })?;

    if !output.status.success() {
        return Err(CaptureError::ConfigurationError(
            "Failed to get encoder list from FFmpeg".to_string(),
        ));
    }

    Ok(parse_encoder_list(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `ffmpeg -encoders` output. Entries follow the ` ------` separator
/// as `<flags> <name> <description>`.
pub fn parse_encoder_list(output: &str) -> HashSet<String> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _flags = fields.next()?;
            fields.next().map(str::to_string)
        })
        .collect()
}
