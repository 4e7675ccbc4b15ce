// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{capture, detector, terminal};
use crate::errors::{AppError, AppResult};
use crate::scanner::{ScannerConfig, VideoGravity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Directory name under the user config dir
const CONFIG_DIR: &str = "snoozescan";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// User configuration
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture device to use instead of the first one found (e.g. "/dev/video2")
    pub device_path: Option<String>,
    /// How frames are scaled into the preview
    pub preview_gravity: VideoGravity,
    /// Mirror camera preview horizontally (front cameras)
    pub mirror_preview: bool,
    /// Frames larger than this are downscaled before detection
    pub max_detect_dimension: u32,
    /// Requested capture width
    pub frame_width: u32,
    /// Requested capture height
    pub frame_height: u32,
    /// How long the final message stays on screen after a successful scan
    pub dismiss_animation_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_path: None,
            preview_gravity: VideoGravity::default(),
            mirror_preview: false,
            max_detect_dimension: detector::DEFAULT_MAX_DIMENSION,
            frame_width: capture::DEFAULT_FRAME_WIDTH,
            frame_height: capture::DEFAULT_FRAME_HEIGHT,
            dismiss_animation_ms: terminal::DEFAULT_DISMISS_ANIMATION_MS,
        }
    }
}

impl Config {
    /// Default config file location (`$XDG_CONFIG_HOME/snoozescan/config.json`)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> AppResult<Self> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory available, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Presentation settings handed to the scanner
    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            gravity: self.preview_gravity,
            mirrored: self.mirror_preview,
            max_detect_dimension: self.max_detect_dimension,
        }
    }

    pub fn dismiss_animation(&self) -> Duration {
        Duration::from_millis(self.dismiss_animation_ms)
    }
}
