//! Try-On Compositor
//!
//! Produces one rendered frame per camera frame onto a [`DrawingSurface`].
//!
//! # Architecture
//!
//! ```text
//! Compositor::render
//!   ├─> clear
//!   └─> SavedContext (restored on drop)
//!         ├─> mirror: scale(-1, 1), translate(-w, 0)
//!         ├─> camera frame, stretched to the surface
//!         └─> if hand && artwork loaded:
//!               translate(anchor), rotate(angle), shadow,
//!               artwork centred at (-size/2, -size/2), size x size
//! ```
//!
//! # Surfaces
//!
//! - [`SoftwareSurface`] - RGBA framebuffer, affine sampling, blurred shadow
//! - [`RecordingSurface`] - records calls; used to check ordering and
//!   save/restore balance

pub mod recording;
pub mod renderer;
pub mod software;
pub mod surface;

pub use recording::{DrawOp, RecordingSurface};
pub use renderer::{Compositor, RenderOutcome};
pub use software::SoftwareSurface;
pub use surface::{DrawingSurface, SavedContext, Shadow};
