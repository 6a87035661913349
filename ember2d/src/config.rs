//! Engine configuration: window, simulation and camera defaults.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::math::Vec2;
use crate::physics::DEFAULT_GRAVITY;
use crate::surface::Color;

/// Configuration values for the engine window and runtime behavior.
///
/// Every field is optional in JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub title: String,
    /// Canvas size in pixels. The window opens at this logical size.
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub gravity: Vec2,
    pub clear_color: Color,
    pub camera_lerp: f32,
    pub camera_zoom: f32,
    /// TTF/OTF file used for `fill_text` in the windowed runner.
    pub font: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Ember2D".into(),
            width: 800,
            height: 600,
            vsync: true,
            gravity: DEFAULT_GRAVITY,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            camera_lerp: 1.0,
            camera_zoom: 1.0,
            font: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Invalid engine config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config {}", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.camera_zoom.is_finite() || self.camera_zoom <= 0.0 {
            return Err(ConfigError::InvalidZoom(self.camera_zoom));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    #[must_use]
    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    #[must_use]
    pub fn with_camera_lerp(mut self, lerp: f32) -> Self {
        self.camera_lerp = lerp.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn with_camera_zoom(mut self, zoom: f32) -> Self {
        self.camera_zoom = zoom;
        self
    }

    #[must_use]
    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.font = Some(path.into());
        self
    }
}
