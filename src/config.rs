//! Editor configuration.
//!
//! Search order:
//! 1. Explicit path if provided
//! 2. `spring-network.json` in the working directory
//! 3. Built-in defaults

use crate::clipboard::DEFAULT_PASTE_OFFSET;
use crate::viewport::{GridSnap, DEFAULT_HIT_RADIUS_PX, MAX_ZOOM_PERCENT, MIN_ZOOM_PERCENT};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const LOCAL_CONFIG_FILE: &str = "spring-network.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse JSON configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),

    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Grid spacing in graph units
    pub grid_size: f64,
    pub snap_to_grid: bool,
    pub zoom_percent: f64,
    /// Pointer travel, in screen pixels, before a press becomes a drag
    pub drag_epsilon_px: f32,
    pub hit_radius_px: f32,
    pub paste_offset: f64,
    pub log_level: String,
    /// Where the GUI persists its session
    pub session_path: Option<PathBuf>,
    /// JSON-lines file the GUI appends store events to
    pub event_log_path: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: 0.5,
            snap_to_grid: false,
            zoom_percent: 100.0,
            drag_epsilon_px: 3.0,
            hit_radius_px: DEFAULT_HIT_RADIUS_PX,
            paste_offset: DEFAULT_PASTE_OFFSET,
            log_level: "info".to_string(),
            session_path: None,
            event_log_path: None,
        }
    }
}

impl EditorConfig {
    pub fn grid(&self) -> GridSnap {
        GridSnap::new(self.snap_to_grid, self.grid_size)
    }

    /// Reject values the editor cannot work with; clamp zoom into range
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if !(self.grid_size.is_finite() && self.grid_size > 0.0) {
            return Err(ConfigError::Validation(format!(
                "grid_size must be positive, got {}",
                self.grid_size
            )));
        }
        if !(self.drag_epsilon_px.is_finite() && self.drag_epsilon_px >= 0.0) {
            return Err(ConfigError::Validation(format!(
                "drag_epsilon_px must be non-negative, got {}",
                self.drag_epsilon_px
            )));
        }
        if !(self.hit_radius_px.is_finite() && self.hit_radius_px > 0.0) {
            return Err(ConfigError::Validation(format!(
                "hit_radius_px must be positive, got {}",
                self.hit_radius_px
            )));
        }
        if !self.paste_offset.is_finite() {
            return Err(ConfigError::Validation("paste_offset must be finite".to_string()));
        }
        if !self.zoom_percent.is_finite() {
            self.zoom_percent = 100.0;
        }
        self.zoom_percent = self.zoom_percent.clamp(MIN_ZOOM_PERCENT, MAX_ZOOM_PERCENT);
        Ok(self)
    }
}

/// Find and load the configuration.
///
/// # Errors
///
/// Returns error if an explicit path is given but missing, or if a config
/// file exists but cannot be read, parsed or validated.
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<EditorConfig, ConfigError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new(LOCAL_CONFIG_FILE);
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    debug!("No configuration file found, using default configuration");
    Ok(EditorConfig::default())
}

pub fn load_config_file(path: impl AsRef<Path>) -> Result<EditorConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: EditorConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

    config.validated()
}
