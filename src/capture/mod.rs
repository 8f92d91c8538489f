//! Camera and hand-detector capabilities
//!
//! The try-on engine never talks to a concrete camera or landmark model. It
//! consumes two capability traits:
//!
//! - [`Camera`] - permission request, start/stop of a live frame stream
//! - [`HandDetector`] - one-time initialization, then synchronous per-frame
//!   landmark detection
//!
//! Any runtime can substitute its own implementation. [`replay`] provides
//! deterministic ones driven by a recorded session file.
//!
//! # Contracts
//!
//! - `stop()` and `close()` are synchronous and idempotent, and must be safe
//!   to call before `start()`/`initialize()` completed. Teardown calls them
//!   unconditionally.
//! - `detect()` runs inside the frame callback and must not block on I/O.
//! - Frames arrive on a bounded channel in capture order.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::{CameraSettings, DetectorSettings};
use crate::error::Result;
use crate::landmarks::LandmarkSet;

pub mod frame;
pub mod replay;

pub use frame::{FrameStats, PixelFormat, VideoFrame};
pub use replay::{Recording, RecordedFrame, ReplayCamera, ReplayDetector};

/// Receiving end of a live camera stream
pub type FrameReceiver = mpsc::Receiver<VideoFrame>;

/// Live camera capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Camera: Send + Sync {
    /// Whether the runtime exposes a camera API at all
    fn is_available(&self) -> bool;

    /// Ask for camera access. Acquires the device and releases it again;
    /// only the permission outcome matters.
    async fn request_access(&self, settings: &CameraSettings) -> Result<()>;

    /// Start capture and return the frame stream
    async fn start(&self, settings: &CameraSettings) -> Result<FrameReceiver>;

    /// Stop capture and release the device
    fn stop(&self) -> Result<()>;
}

/// Hand landmark detector capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HandDetector: Send + Sync {
    /// Whether the runtime can host the detector
    fn is_available(&self) -> bool;

    /// Load the model and apply settings
    async fn initialize(&self, settings: &DetectorSettings) -> Result<()>;

    /// Detect hands on one frame, in detector order
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<LandmarkSet>>;

    /// Release the model
    fn close(&self) -> Result<()>;
}
