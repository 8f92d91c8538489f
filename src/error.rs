//! Try-On Error Types
//!
//! Error taxonomy for the try-on session: capability and permission failures
//! surface to the user, per-frame faults and teardown faults never do.

use thiserror::Error;

/// Result type for try-on operations
pub type Result<T> = std::result::Result<T, TryOnError>;

/// Try-on error types
#[derive(Error, Debug)]
pub enum TryOnError {
    /// Camera or detector API is missing from the runtime
    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// User refused camera access
    #[error("Camera permission denied")]
    PermissionDenied,

    /// Camera could not be opened or started
    #[error("Camera acquisition failed: {0}")]
    AcquisitionFailed(String),

    /// Hand detector failed to start
    #[error("Detector initialization failed: {0}")]
    DetectorInitFailed(String),

    /// Camera stream closed while the session was still live
    #[error("Camera stream ended")]
    StreamEnded,

    /// A single frame could not be processed
    #[error("Frame processing failed: {0}")]
    FrameProcessing(String),

    /// Detector produced a malformed landmark set
    #[error("Invalid landmark set: {0}")]
    InvalidLandmarks(String),

    /// Overlay artwork could not be loaded
    #[error("Overlay image load failed: {0}")]
    OverlayLoad(String),

    /// Stopping the camera or detector failed
    #[error("Teardown failed: {0}")]
    Teardown(String),

    /// Replay recording could not be read
    #[error("Recording error: {0}")]
    Recording(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Error classification used for propagation decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Runtime lacks camera or detector support
    CapabilityUnavailable,
    /// Camera access refused
    Permission,
    /// Camera or detector failed to start, or the stream ended
    Acquisition,
    /// Per-frame fault (swallowed)
    FrameProcessing,
    /// Overlay artwork or recording assets
    Asset,
    /// Resource release fault (swallowed)
    Teardown,
}

/// Classify error for propagation
pub fn classify_error(error: &TryOnError) -> ErrorKind {
    match error {
        TryOnError::CapabilityUnavailable(_) => ErrorKind::CapabilityUnavailable,

        TryOnError::PermissionDenied => ErrorKind::Permission,

        TryOnError::AcquisitionFailed(_)
        | TryOnError::DetectorInitFailed(_)
        | TryOnError::StreamEnded => ErrorKind::Acquisition,

        TryOnError::FrameProcessing(_) | TryOnError::InvalidLandmarks(_) => {
            ErrorKind::FrameProcessing
        }

        TryOnError::Teardown(_) => ErrorKind::Teardown,

        TryOnError::OverlayLoad(_)
        | TryOnError::Recording(_)
        | TryOnError::Io(_)
        | TryOnError::Image(_) => ErrorKind::Asset,
    }
}

impl TryOnError {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        classify_error(self)
    }

    /// Whether this error ends session establishment and must be shown
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::CapabilityUnavailable | ErrorKind::Permission | ErrorKind::Acquisition
        )
    }

    /// Message for the blocking error overlay
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::CapabilityUnavailable => {
                "This device does not support camera try-on. Please try another browser or device."
            }
            ErrorKind::Permission | ErrorKind::Acquisition => {
                "Camera cannot be accessed. Please check your access permissions."
            }
            ErrorKind::FrameProcessing => "A frame could not be processed.",
            ErrorKind::Asset => "The ring artwork could not be loaded.",
            ErrorKind::Teardown => "The camera could not be released cleanly.",
        }
    }
}
