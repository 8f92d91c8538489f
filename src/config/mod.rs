//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - CLI arguments
//!
//! Every tunable has a default equal to the values the try-on was designed
//! around, so an empty file is a valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod types;

pub use types::{
    CameraSettings, DetectorSettings, LoggingConfig, ManualScaleConfig, OverlayConfig,
    ShadowConfig, SmoothingConfig, SurfaceConfig,
};

use crate::landmarks::LANDMARK_COUNT;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Camera capture configuration
    #[serde(default)]
    pub camera: CameraSettings,
    /// Hand detector configuration
    #[serde(default)]
    pub detector: DetectorSettings,
    /// Overlay placement configuration
    #[serde(default)]
    pub overlay: OverlayConfig,
    /// Size smoothing configuration
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    /// Manual scale control configuration
    #[serde(default)]
    pub manual_scale: ManualScaleConfig,
    /// Overlay drop shadow
    #[serde(default)]
    pub shadow: ShadowConfig,
    /// Drawing surface configuration
    #[serde(default)]
    pub surface: SurfaceConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Default config location (`$XDG_CONFIG_HOME/tryon-overlay/config.toml`)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tryon-overlay")
            .join("config.toml")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            anyhow::bail!(
                "Invalid camera resolution: {}x{}",
                self.camera.width,
                self.camera.height
            );
        }
        if self.camera.frame_rate == 0 {
            anyhow::bail!("Camera frame rate must be positive");
        }
        if self.camera.frame_queue == 0 {
            anyhow::bail!("Camera frame queue must hold at least one frame");
        }
        match self.camera.facing_mode.as_str() {
            "user" | "environment" => {}
            _ => anyhow::bail!("Invalid facing mode: {}", self.camera.facing_mode),
        }

        if self.detector.max_num_hands != 1 {
            anyhow::bail!(
                "max_num_hands must be 1 (got {}); multi-hand try-on is not supported",
                self.detector.max_num_hands
            );
        }
        for (name, value) in [
            ("min_detection_confidence", self.detector.min_detection_confidence),
            ("min_tracking_confidence", self.detector.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} ({}) must be between 0.0 and 1.0", name, value);
            }
        }

        for (name, index) in [
            ("base_landmark", self.overlay.base_landmark),
            ("joint_landmark", self.overlay.joint_landmark),
        ] {
            if index >= LANDMARK_COUNT {
                anyhow::bail!("{} ({}) must be below {}", name, index, LANDMARK_COUNT);
            }
        }
        if self.overlay.base_landmark == self.overlay.joint_landmark {
            anyhow::bail!("base_landmark and joint_landmark must differ");
        }
        if !(0.0..=1.0).contains(&self.overlay.position_blend) {
            anyhow::bail!(
                "position_blend ({}) must be between 0.0 and 1.0",
                self.overlay.position_blend
            );
        }
        if !(self.overlay.size_ratio > 0.0) {
            anyhow::bail!("size_ratio ({}) must be positive", self.overlay.size_ratio);
        }

        if !(0.0..1.0).contains(&self.smoothing.factor) {
            anyhow::bail!(
                "smoothing factor ({}) must be in [0.0, 1.0)",
                self.smoothing.factor
            );
        }

        let scale = &self.manual_scale;
        if !(scale.min > 0.0) || scale.min > scale.max {
            anyhow::bail!(
                "manual scale range [{}, {}] is invalid",
                scale.min,
                scale.max
            );
        }
        if scale.default < scale.min || scale.default > scale.max {
            anyhow::bail!(
                "manual scale default ({}) must be between min ({}) and max ({})",
                scale.default,
                scale.min,
                scale.max
            );
        }
        if !(scale.step > 0.0) {
            anyhow::bail!("manual scale step ({}) must be positive", scale.step);
        }

        if self.shadow.blur < 0.0 {
            anyhow::bail!("shadow blur ({}) cannot be negative", self.shadow.blur);
        }

        if self.surface.width == 0 || self.surface.height == 0 {
            anyhow::bail!(
                "Invalid surface size: {}x{}",
                self.surface.width,
                self.surface.height
            );
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => {}
            _ => anyhow::bail!("Invalid log format: {}", self.logging.format),
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(
        mut self,
        surface_size: Option<(u32, u32)>,
        log_format: Option<String>,
        log_file: Option<PathBuf>,
    ) -> Self {
        if let Some((width, height)) = surface_size {
            self.surface.width = width;
            self.surface.height = height;
        }
        if let Some(format) = log_format {
            self.logging.format = format;
        }
        if log_file.is_some() {
            self.logging.file = log_file;
        }

        self
    }
}
