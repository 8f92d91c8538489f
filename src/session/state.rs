//! Session phases, per-session state and user-facing status

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use crate::capture::FrameStats;
use crate::error::{ErrorKind, TryOnError};
use crate::overlay::{OverlayPlacement, SmoothingState};

/// Try-on session phase
///
/// ```text
/// Idle -> Initializing -> Tracking <-> HandLost
///              |             |            |
///              v             v            v
///            Error <---------+------------+
///              |
///              +-- retry --> Initializing
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    /// Not mounted, no resources held
    #[default]
    Idle,
    /// Acquiring camera permission and starting the detector
    Initializing,
    /// Frames flowing, hand on the current frame
    Tracking,
    /// Frames flowing, no hand on the current frame
    HandLost,
    /// Waiting for retry or close
    Error,
}

impl SessionPhase {
    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(self, next: SessionPhase) -> bool {
        use SessionPhase::*;

        match (self, next) {
            (a, b) if a == b => true,
            (_, Idle) => true,
            (_, Initializing) => true,
            (Initializing | Tracking | HandLost, Tracking | HandLost) => true,
            (Initializing | Tracking | HandLost, Error) => true,
            _ => false,
        }
    }

    /// Frames are being delivered
    pub fn is_streaming(self) -> bool {
        matches!(self, SessionPhase::Tracking | SessionPhase::HandLost)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Initializing => "initializing",
            SessionPhase::Tracking => "tracking",
            SessionPhase::HandLost => "hand-lost",
            SessionPhase::Error => "error",
        };
        f.write_str(name)
    }
}

/// Mutable state owned by one session
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Size smoothing history
    pub smoothing: SmoothingState,
    /// Frame counters
    pub stats: FrameStats,
    /// Placement drawn on the last processed frame
    pub last_placement: Option<OverlayPlacement>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cancellation flag for one session
///
/// Revoked before any other teardown step; every post-await step of the
/// session checks it before touching shared state.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn revoke(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Failure shown on the blocking error overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFailure {
    pub kind: ErrorKind,
    /// Text for the user
    pub message: String,
    /// Underlying error, for logs
    pub detail: String,
    /// The camera stream closed on its own
    pub stream_ended: bool,
}

impl From<&TryOnError> for SessionFailure {
    fn from(error: &TryOnError) -> Self {
        Self {
            kind: error.kind(),
            message: error.user_message().to_string(),
            detail: error.to_string(),
            stream_ended: matches!(error, TryOnError::StreamEnded),
        }
    }
}

/// Observable try-on status
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TryOnStatus {
    pub phase: SessionPhase,
    /// Hand present on the last processed frame
    pub hand_detected: bool,
    pub failure: Option<SessionFailure>,
    /// Times the user pressed retry
    pub retry_count: u32,
    /// Overlay artwork finished loading
    pub overlay_loaded: bool,
}

impl TryOnStatus {
    /// Spinner shown until the first frame arrives
    pub fn is_loading(&self) -> bool {
        self.phase == SessionPhase::Initializing && self.failure.is_none()
    }

    pub fn loading_text(&self) -> Option<&'static str> {
        self.is_loading().then_some("Starting the camera...")
    }

    /// Badge in the top bar
    pub fn hand_label(&self) -> &'static str {
        if self.hand_detected {
            "Hand detected"
        } else {
            "Please raise your hand."
        }
    }

    /// Instruction line at the bottom
    pub fn instruction(&self) -> &'static str {
        if self.hand_detected {
            "Use the right sidebar to adjust the size"
        } else {
            "Raise your ring finger to the camera."
        }
    }

    /// Size controls are offered only while a hand is tracked
    pub fn show_size_controls(&self) -> bool {
        self.phase.is_streaming() && self.hand_detected && self.failure.is_none()
    }
}

/// Status writer bound to one session
///
/// Writes are dropped once the session is revoked. The liveness check runs
/// under the channel lock, so a revoked session can never overwrite status
/// published by its successor.
#[derive(Clone)]
pub(crate) struct StatusHandle {
    tx: watch::Sender<TryOnStatus>,
    liveness: Liveness,
}

impl StatusHandle {
    pub(crate) fn new(tx: watch::Sender<TryOnStatus>, liveness: Liveness) -> Self {
        Self { tx, liveness }
    }

    /// Move to `next` if legal; returns whether the status changed
    ///
    /// Entering `Idle` or `Initializing` also clears the hand flag and any
    /// failure left by a previous session.
    pub(crate) fn transition(&self, next: SessionPhase) -> bool {
        self.update(|status| {
            if !status.phase.can_transition_to(next) {
                warn!("Ignoring invalid transition {} -> {}", status.phase, next);
                return false;
            }
            let mut changed = status.phase != next;
            status.phase = next;
            if matches!(next, SessionPhase::Idle | SessionPhase::Initializing) {
                changed |= status.hand_detected || status.failure.is_some();
                status.hand_detected = false;
                status.failure = None;
            }
            changed
        })
    }

    /// Record a processed frame
    pub(crate) fn frame(&self, hand_detected: bool) {
        let next = if hand_detected {
            SessionPhase::Tracking
        } else {
            SessionPhase::HandLost
        };
        self.update(|status| {
            let mut changed = false;
            if status.phase != next && status.phase.can_transition_to(next) {
                status.phase = next;
                changed = true;
            }
            if status.hand_detected != hand_detected {
                status.hand_detected = hand_detected;
                changed = true;
            }
            changed
        });
    }

    /// Enter `Error` with a user-facing failure
    pub(crate) fn fail(&self, error: &TryOnError) {
        let failure = SessionFailure::from(error);
        self.update(|status| {
            if !status.phase.can_transition_to(SessionPhase::Error) {
                warn!("Ignoring failure in phase {}: {}", status.phase, failure.detail);
                return false;
            }
            status.phase = SessionPhase::Error;
            status.hand_detected = false;
            status.failure = Some(failure);
            true
        });
    }

    fn update(&self, f: impl FnOnce(&mut TryOnStatus) -> bool) -> bool {
        let liveness = &self.liveness;
        self.tx.send_if_modified(|status| liveness.is_alive() && f(status))
    }
}
