//! Try-on session lifecycle
//!
//! # Lifecycle
//!
//! ```text
//! mount ──> start session ──> [task] acquire ──> frame loop ──> stream end
//!                                 │                  │              │
//!                                 v                  v              v
//!                               Error        Tracking/HandLost    Error
//!
//! retry   = teardown + retry_count += 1 + start session (fresh state)
//! unmount = teardown + Idle
//! ```
//!
//! # Teardown Order
//!
//! 1. Revoke the session's [`Liveness`]; pending acquisition steps and
//!    status writes from the old task become no-ops
//! 2. `camera.stop()` and `detector.close()`, failures logged and dropped
//! 3. Abort the session task
//!
//! Each session gets its own [`SessionState`], so nothing an old task does
//! can leak into its successor.

mod processor;
mod state;
mod view;

pub use processor::FrameCallback;
pub use state::{Liveness, SessionFailure, SessionPhase, SessionState, TryOnStatus};
pub use view::{TryOnProps, TryOnView};
