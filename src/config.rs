//! Configuration file support.
//!
//! Settings live in a versioned JSON file under the platform config directory.
//! Every field has a default, so partial files load fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    CENTER_BLEND_START_SCALE, HIT_OCCUPANCY_THRESHOLD, MAX_CENTER_WEIGHT, MAX_SCALE,
    POINT_HIT_RADIUS_PX, ZOOM_FACTOR,
};
use crate::format::LabelMode;
use crate::picker::Picker;
use crate::view_transform::ZoomSettings;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default)]
    pub preferences: UserPreferences,

    #[serde(default)]
    pub view: ViewConfig,

    #[serde(default)]
    pub picking: PickingConfig,

    #[serde(default)]
    pub oracle: OracleConfig,

    /// Class names registered (in order) when a session starts
    #[serde(default)]
    pub classes: Vec<String>,
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Encoding used when an export does not name one
    #[serde(default)]
    pub label_mode: LabelMode,

    /// Write `<stem>_segmented.png` previews alongside label files
    #[serde(default = "default_true")]
    pub write_overlays: bool,

    /// Undo history length
    #[serde(default = "default_undo_history")]
    pub undo_history: usize,
}

fn default_true() -> bool {
    true
}

fn default_undo_history() -> usize {
    100
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            label_mode: LabelMode::default(),
            write_overlays: default_true(),
            undo_history: default_undo_history(),
        }
    }
}

/// Zoom behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_zoom_factor")]
    pub zoom_factor: f32,
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,
}

fn default_zoom_factor() -> f32 {
    ZOOM_FACTOR
}

fn default_max_scale() -> f32 {
    MAX_SCALE
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            zoom_factor: default_zoom_factor(),
            max_scale: default_max_scale(),
        }
    }
}

impl ViewConfig {
    pub fn zoom_settings(&self) -> ZoomSettings {
        ZoomSettings {
            factor: self.zoom_factor,
            max_scale: self.max_scale,
            blend_start_scale: CENTER_BLEND_START_SCALE,
            max_center_weight: MAX_CENTER_WEIGHT,
        }
    }
}

/// Hover/selection tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickingConfig {
    /// Screen-space point pick radius in pixels
    #[serde(default = "default_radius")]
    pub point_radius_px: f32,
    /// Mask value that counts as a hover hit
    #[serde(default = "default_occupancy")]
    pub occupancy_threshold: f32,
}

fn default_radius() -> f32 {
    POINT_HIT_RADIUS_PX
}

fn default_occupancy() -> f32 {
    HIT_OCCUPANCY_THRESHOLD
}

impl Default for PickingConfig {
    fn default() -> Self {
        Self {
            point_radius_px: default_radius(),
            occupancy_threshold: default_occupancy(),
        }
    }
}

impl PickingConfig {
    pub fn picker(&self) -> Picker {
        Picker::new(self.point_radius_px, self.occupancy_threshold)
    }
}

/// External segmentation program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Command line of the oracle program; empty disables segmentation
    #[serde(default)]
    pub command: String,
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: UserPreferences::default(),
            view: ViewConfig::default(),
            picking: PickingConfig::default(),
            oracle: OracleConfig::default(),
            classes: Vec::new(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "seglabel-config.json"
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("seglabel").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("seglabel")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load from an explicit path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }
        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
