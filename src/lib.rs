//! # tryon-overlay
//!
//! Real-time virtual ring try-on: places ring artwork on the ring finger of
//! a tracked hand in a live, mirrored camera view.
//!
//! # Architecture
//!
//! ```text
//! tryon-overlay
//!   ├─> Camera (frame source, permission gate)
//!   ├─> HandDetector (21 landmarks per hand)
//!   ├─> FramePipeline (anchor, angle, size, smoothing)
//!   ├─> Compositor (mirror, frame, rotated ring with drop shadow)
//!   └─> TryOnView (mount/retry/unmount, manual scale, status)
//! ```
//!
//! # Data Flow
//!
//! **Frame Path:** Camera → HandDetector → FramePipeline → Compositor → Surface
//!
//! **Control Path:** User → ManualScale → next frame's target size
//!
//! **Status Path:** Session task → watch channel → UI (loading, badge, error)

#![warn(clippy::all)]

/// Configuration
pub mod config;

/// Error types
pub mod error;

/// Hand landmark model
pub mod landmarks;

/// Camera and hand detector abstractions, plus file-backed replay
pub mod capture;

/// Overlay placement: geometry, size smoothing, manual scale, artwork
pub mod overlay;

/// Drawing surfaces and the per-frame compositor
pub mod compositor;

/// Try-on session lifecycle and observable status
pub mod session;

/// Utility functions
pub mod utils;

pub use config::Config;
pub use error::{ErrorKind, Result, TryOnError};
pub use landmarks::{HandLandmark, LandmarkSet};
pub use session::{SessionPhase, TryOnProps, TryOnStatus, TryOnView};
