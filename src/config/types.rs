//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Camera capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Requested capture width in pixels
    pub width: u32,

    /// Requested capture height in pixels
    pub height: u32,

    /// Requested frames per second
    pub frame_rate: u32,

    /// Facing mode ("user" = front/selfie camera, "environment" = rear)
    #[serde(default = "default_facing_mode")]
    pub facing_mode: String,

    /// Bounded queue depth between the camera and the frame callback
    #[serde(default = "default_frame_queue")]
    pub frame_queue: usize,
}

fn default_facing_mode() -> String {
    "user".to_string()
}

fn default_frame_queue() -> usize {
    2
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: 30,
            facing_mode: default_facing_mode(),
            frame_queue: default_frame_queue(),
        }
    }
}

/// Hand detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSettings {
    /// Maximum hands reported per frame (only 1 is supported)
    pub max_num_hands: u32,

    /// Landmark model complexity (0 = lite, 1 = full)
    pub model_complexity: u8,

    /// Minimum confidence for initial palm detection (0.0-1.0)
    pub min_detection_confidence: f32,

    /// Minimum confidence for frame-to-frame tracking (0.0-1.0)
    pub min_tracking_confidence: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            max_num_hands: 1,
            model_complexity: 1,
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.7,
        }
    }
}

/// Overlay placement configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Landmark index of the ring-finger base joint
    #[serde(default = "default_base_landmark")]
    pub base_landmark: usize,

    /// Landmark index of the ring-finger middle joint
    #[serde(default = "default_joint_landmark")]
    pub joint_landmark: usize,

    /// Anchor weight given to the base joint (0.0-1.0)
    #[serde(default = "default_position_blend")]
    pub position_blend: f64,

    /// Overlay size as a fraction of the finger segment length
    #[serde(default = "default_size_ratio")]
    pub size_ratio: f64,
}

fn default_base_landmark() -> usize {
    crate::landmarks::RING_FINGER_MCP
}
fn default_joint_landmark() -> usize {
    crate::landmarks::RING_FINGER_PIP
}
fn default_position_blend() -> f64 {
    0.65
}
fn default_size_ratio() -> f64 {
    0.8
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            base_landmark: default_base_landmark(),
            joint_landmark: default_joint_landmark(),
            position_blend: default_position_blend(),
            size_ratio: default_size_ratio(),
        }
    }
}

/// Size smoothing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Weight given to history (0.0-1.0, higher = steadier)
    #[serde(default = "default_smoothing_factor")]
    pub factor: f64,

    /// Frames at session start that bypass smoothing
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: u64,
}

fn default_smoothing_factor() -> f64 {
    0.6
}
fn default_warmup_frames() -> u64 {
    10
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            factor: default_smoothing_factor(),
            warmup_frames: default_warmup_frames(),
        }
    }
}

/// Manual scale control configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualScaleConfig {
    /// Lower bound of the multiplier
    pub min: f64,

    /// Upper bound of the multiplier
    pub max: f64,

    /// Increment applied by one increase/decrease action
    pub step: f64,

    /// Value restored by reset
    pub default: f64,
}

impl Default for ManualScaleConfig {
    fn default() -> Self {
        Self {
            min: 0.1,
            max: 3.0,
            step: 0.05,
            default: 1.0,
        }
    }
}

/// Drop shadow drawn under the overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowConfig {
    /// Blur radius in pixels
    pub blur: f64,

    /// Shadow colour as RGBA
    pub color: [u8; 4],

    /// Horizontal offset in pixels
    pub offset_x: f64,

    /// Vertical offset in pixels
    pub offset_y: f64,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            blur: 15.0,
            color: [0, 0, 0, 128],
            offset_x: 0.0,
            offset_y: 5.0,
        }
    }
}

/// Drawing surface configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Surface width in pixels
    pub width: u32,

    /// Surface height in pixels
    pub height: u32,

    /// Mirror the camera frame horizontally (selfie view)
    #[serde(default = "default_true")]
    pub mirror: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            mirror: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    pub level: String,

    /// Output format ("pretty", "compact", "json")
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log file (None = console only)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: default_log_format(),
            file: None,
        }
    }
}
