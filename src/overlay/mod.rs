//! Overlay placement
//!
//! Everything that decides where the ring goes and how large it is:
//!
//! - [`geometry`] - anchor, angle and characteristic length from two joints
//! - [`scale`] - user multiplier and target size composition
//! - [`smoothing`] - moving average over the size with warm-up bypass
//! - [`pipeline`] - the per-frame chain of the three
//! - [`image`] - the artwork itself
//!
//! # Data Flow
//!
//! ```text
//! LandmarkSet ──> GeometryResolver ──> raw_size
//!                                         │
//!                  ManualScale::get() ──> x ──> target_size
//!                                                   │
//!                           SmoothingState <──> SmoothingFilter ──> size
//! ```
//!
//! The manual scale is read, never written, by the frame path. Smoothing
//! history is written only by [`SmoothingFilter`].

pub mod geometry;
pub mod image;
pub mod pipeline;
pub mod scale;
pub mod smoothing;

pub use geometry::{GeometryResolver, OverlayTransform};
pub use image::{OverlayImage, OverlaySlot};
pub use pipeline::{FramePipeline, OverlayPlacement};
pub use scale::{compose_target_size, ManualScale};
pub use smoothing::{SmoothingFilter, SmoothingState};
