//! Landmark geometry
//!
//! Turns the ring-finger base and middle joints into an anchor, a rotation
//! and a characteristic length in surface pixels.

use nalgebra::Vector2;
use std::f64::consts::FRAC_PI_2;

use crate::config::OverlayConfig;
use crate::landmarks::LandmarkSet;

/// Per-frame placement derived from landmarks, before scaling and smoothing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayTransform {
    /// Anchor x in surface pixels
    pub anchor_x: f64,
    /// Anchor y in surface pixels
    pub anchor_y: f64,
    /// Rotation in radians; 0 points the overlay's up axis along -y
    pub angle: f64,
    /// Unscaled overlay size in pixels
    pub raw_size: f64,
}

/// Geometry resolver
#[derive(Debug, Clone)]
pub struct GeometryResolver {
    base_index: usize,
    joint_index: usize,
    position_blend: f64,
    size_ratio: f64,
}

impl GeometryResolver {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            base_index: config.base_landmark,
            joint_index: config.joint_landmark,
            position_blend: config.position_blend,
            size_ratio: config.size_ratio,
        }
    }

    /// Resolve one hand against a `width` x `height` surface
    pub fn resolve(&self, hand: &LandmarkSet, width: f64, height: f64) -> OverlayTransform {
        let anchors = hand.anchor_points(self.base_index, self.joint_index);
        let base = Vector2::new(anchors.base.x, anchors.base.y);
        let joint = Vector2::new(anchors.joint.x, anchors.joint.y);
        let surface = Vector2::new(width, height);

        // Blend in normalized space, then scale per axis
        let anchor = (base * self.position_blend + joint * (1.0 - self.position_blend))
            .component_mul(&surface);

        let segment = (joint - base).component_mul(&surface);
        let angle = segment.y.atan2(segment.x) + FRAC_PI_2;

        OverlayTransform {
            anchor_x: anchor.x,
            anchor_y: anchor.y,
            angle,
            raw_size: segment.norm() * self.size_ratio,
        }
    }
}

impl Default for GeometryResolver {
    fn default() -> Self {
        Self::new(&OverlayConfig::default())
    }
}
