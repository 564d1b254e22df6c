use crate::engine::EngineOptions;
use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Saved defaults for the recorder. Every field is optional; unset fields
/// keep the engine defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RecorderConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    /// Seconds of video per file; 0 disables splitting
    pub max_file_duration: Option<u64>,
    pub display: Option<usize>,
    pub audio_device: Option<String>,
}

impl RecorderConfig {
    pub fn engine_options(&self) -> EngineOptions {
        let mut options = EngineOptions {
            ffmpeg_path: self.ffmpeg_path.clone(),
            output_dir: self.output_dir.clone(),
            audio_device: self.audio_device.clone(),
            ..EngineOptions::default()
        };
        match self.max_file_duration {
            Some(0) => options.max_file_duration = None,
            Some(secs) => options.max_file_duration = Some(Duration::from_secs(secs)),
            None => {}
        }
        options
    }
}

pub fn config_file_path() -> Result<PathBuf> {
    let base = config_dir().context("Could not determine user config directory")?;
    Ok(base.join("screenrec").join("config.toml"))
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Create config dir: {}", parent.display()))?;
    }
    Ok(())
}

pub fn load_config() -> Result<RecorderConfig> {
    load_config_from(&config_file_path()?)
}

pub fn load_config_from(path: &Path) -> Result<RecorderConfig> {
    if !path.exists() {
        return Ok(RecorderConfig::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let cfg: RecorderConfig = toml::from_str(&content).with_context(|| {
        format!(
            "Failed to parse config file: {}\n\
            The file may be corrupted. You can delete it and run 'screenrec config' to recreate it.",
            path.display()
        )
    })?;
    Ok(cfg)
}

pub fn save_config(cfg: &RecorderConfig) -> Result<()> {
    save_config_to(cfg, &config_file_path()?)
}

pub fn save_config_to(cfg: &RecorderConfig, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let content = toml::to_string_pretty(cfg)
        .context("Failed to serialize configuration to TOML format")?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    Ok(())
}

/// Delete the saved configuration. Returns whether there was one.
pub fn clear_config() -> Result<bool> {
    let path = config_file_path()?;
    if path.exists() {
        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete config file: {}", path.display()))?;
        Ok(true)
    } else {
        Ok(false)
    }
}
