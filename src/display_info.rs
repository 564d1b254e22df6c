use crate::error::{CaptureError, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayInfo {
    pub index: usize,
    pub width: usize,
    pub height: usize,
    pub x: i32,
    pub y: i32,
    pub is_primary: bool,
}

/// What the capture engine records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayTarget {
    /// A physical display. `origin` is its top-left corner on the virtual
    /// desktop; the size is known only when probed.
    Screen {
        index: usize,
        origin: (i32, i32),
        size: Option<(usize, usize)>,
    },
    /// A generated test picture, no graphics context needed.
    TestPattern { width: u32, height: u32 },
}

impl DisplayTarget {
    /// Acquire the default screen device of the local graphics environment.
    pub fn default_screen() -> Result<Self> {
        ensure_graphics_context()?;

        let displays = list_displays()?;
        let primary = displays
            .iter()
            .find(|d| d.is_primary)
            .or_else(|| displays.first())
            .ok_or_else(|| CaptureError::ConfigurationError("No displays found".to_string()))?;
        Ok(Self::from_info(primary))
    }

    pub fn screen(index: usize) -> Result<Self> {
        ensure_graphics_context()?;

        let displays = list_displays()?;
        let info = displays.get(index).ok_or_else(|| {
            CaptureError::ConfigurationError(format!(
                "Display {} not found. Available displays: 0-{}",
                index,
                displays.len().saturating_sub(1)
            ))
        })?;
        Ok(Self::from_info(info))
    }

    pub fn from_info(info: &DisplayInfo) -> Self {
        let size = if info.width > 0 && info.height > 0 {
            Some((info.width, info.height))
        } else {
            None
        };

        log::debug!(
            "Acquired display {} at {},{} ({:?})",
            info.index,
            info.x,
            info.y,
            size
        );
        DisplayTarget::Screen {
            index: info.index,
            origin: (info.x, info.y),
            size,
        }
    }

    pub fn test_pattern(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(CaptureError::InvalidParameter(format!(
                "Test pattern size must be positive and even, got {}x{}",
                width, height
            )));
        }
        Ok(DisplayTarget::TestPattern { width, height })
    }

    pub fn is_test_pattern(&self) -> bool {
        matches!(self, DisplayTarget::TestPattern { .. })
    }
}

impl std::fmt::Display for DisplayTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayTarget::Screen {
                index,
                origin: (x, y),
                size: Some((w, h)),
            } => write!(f, "display {} ({}x{} at {},{})", index, w, h, x, y),
            DisplayTarget::Screen { index, size: None, .. } => write!(f, "display {}", index),
            DisplayTarget::TestPattern { width, height } => {
                write!(f, "test pattern ({}x{})", width, height)
            }
        }
    }
}

/// Parse a `WIDTHxHEIGHT` string into a test pattern target.
pub fn parse_test_pattern(size: &str) -> Result<DisplayTarget> {
    let parts: Vec<&str> = size.split('x').collect();
    if parts.len() != 2 {
        return Err(CaptureError::InvalidParameter(format!(
            "Invalid size '{}'. Expected WIDTHxHEIGHT",
            size
        )));
    }
    let width: u32 = parts[0]
        .parse()
        .map_err(|_| CaptureError::InvalidParameter(format!("Invalid width in '{}'", size)))?;
    let height: u32 = parts[1]
        .parse()
        .map_err(|_| CaptureError::InvalidParameter(format!("Invalid height in '{}'", size)))?;
    DisplayTarget::test_pattern(width, height)
}

/// Fail early when there is no display server to grab from.
fn ensure_graphics_context() -> Result<()> {
    if cfg!(target_os = "linux") {
        let has_display = std::env::var_os("DISPLAY")
            .map(|d| !d.is_empty())
            .unwrap_or(false);
        if !has_display {
            return Err(CaptureError::ConfigurationError(
                "No graphics environment: DISPLAY is not set (headless session?)".to_string(),
            ));
        }
    }
    Ok(())
}

/// Get all displays with their bounds.
///
/// On Linux the monitors of the X screen come from `xrandr`, since grabbing
/// a monitor needs its offset on the virtual desktop.
pub fn list_displays() -> Result<Vec<DisplayInfo>> {
    if cfg!(target_os = "linux") {
        match xrandr_monitors() {
            Some(displays) if !displays.is_empty() => return Ok(displays),
            _ => log::debug!("xrandr monitor listing unavailable"),
        }
    }
    backend_displays()
}

fn xrandr_monitors() -> Option<Vec<DisplayInfo>> {
    let output = std::process::Command::new("xrandr")
        .arg("--listmonitors")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(parse_xrandr_monitors(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `xrandr --listmonitors` output, e.g.
/// ` 1: +HDMI-1 2560/597x1440/336+1920+0  HDMI-1`.
/// The monitor marked `*` is primary, else the first one.
pub fn parse_xrandr_monitors(output: &str) -> Vec<DisplayInfo> {
    let mut displays: Vec<DisplayInfo> = output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            fields.next()?.strip_suffix(':')?.parse::<usize>().ok()?;
            let name = fields.next()?;
            let (width, height, x, y) = parse_monitor_geometry(fields.next()?)?;
            Some(DisplayInfo {
                index: 0,
                width,
                height,
                x,
                y,
                is_primary: name.contains('*'),
            })
        })
        .collect();

    for (index, display) in displays.iter_mut().enumerate() {
        display.index = index;
    }
    if !displays.iter().any(|d| d.is_primary) {
        if let Some(first) = displays.first_mut() {
            first.is_primary = true;
        }
    }
    displays
}

/// `W/mmxH/mm+X+Y`; offsets may be negative (`+-1920+0`).
fn parse_monitor_geometry(geometry: &str) -> Option<(usize, usize, i32, i32)> {
    let (width, rest) = geometry.split_once('x')?;
    let width = width.split('/').next()?.parse().ok()?;
    let (height, offsets) = rest.split_once('+')?;
    let height = height.split('/').next()?.parse().ok()?;
    let (x, y) = offsets.split_once('+')?;
    Some((width, height, x.parse().ok()?, y.parse().ok()?))
}

#[cfg(feature = "scrap")]
fn backend_displays() -> Result<Vec<DisplayInfo>> {
    let displays = scrap::Display::all().map_err(|e| {
        CaptureError::ConfigurationError(format!("Failed to enumerate displays: {}", e))
    })?;

    if displays.is_empty() {
        return Err(CaptureError::ConfigurationError(
            "No displays found".to_string(),
        ));
    }

    // scrap doesn't expose display positions, only sizes
    Ok(displays
        .iter()
        .enumerate()
        .map(|(index, display)| DisplayInfo {
            index,
            width: display.width(),
            height: display.height(),
            x: 0,
            y: 0,
            is_primary: index == 0, // Primary display is typically index 0
        })
        .collect())
}

/// Without a capture backend only the default display is known; its size is
/// left to the engine.
#[cfg(not(feature = "scrap"))]
fn backend_displays() -> Result<Vec<DisplayInfo>> {
    Ok(vec![DisplayInfo {
        index: 0,
        width: 0,
        height: 0,
        x: 0,
        y: 0,
        is_primary: true,
    }])
}
