//! Per-frame overlay pipeline
//!
//! landmarks -> geometry -> manual scale -> smoothing

use tracing::trace;

use super::geometry::GeometryResolver;
use super::scale::compose_target_size;
use super::smoothing::{SmoothingFilter, SmoothingState};
use crate::config::Config;
use crate::landmarks::LandmarkSet;

/// Where and how large to draw the overlay on one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPlacement {
    /// Anchor x in surface pixels
    pub anchor_x: f64,
    /// Anchor y in surface pixels
    pub anchor_y: f64,
    /// Rotation in radians
    pub angle: f64,
    /// Smoothed edge length of the square overlay
    pub size: f64,
    /// Geometric size before manual scale
    pub raw_size: f64,
    /// Size after manual scale, before smoothing
    pub target_size: f64,
}

/// Stateless pipeline; all history lives in [`SmoothingState`]
#[derive(Debug, Clone)]
pub struct FramePipeline {
    resolver: GeometryResolver,
    filter: SmoothingFilter,
}

impl FramePipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            resolver: GeometryResolver::new(&config.overlay),
            filter: SmoothingFilter::new(&config.smoothing),
        }
    }

    /// Process one frame
    ///
    /// Counts the frame whether or not a hand is present. Without a hand the
    /// smoothing history is dropped and nothing is placed.
    pub fn step(
        &self,
        state: &mut SmoothingState,
        hand: Option<&LandmarkSet>,
        width: f64,
        height: f64,
        manual_scale: f64,
    ) -> Option<OverlayPlacement> {
        let frame_index = state.begin_frame();

        let Some(hand) = hand else {
            self.filter.mark_hand_lost(state);
            trace!(frame_index, "No hand");
            return None;
        };

        let transform = self.resolver.resolve(hand, width, height);
        let target_size = compose_target_size(transform.raw_size, manual_scale);
        let size = self.filter.filter(state, frame_index, target_size);

        trace!(
            frame_index,
            x = transform.anchor_x,
            y = transform.anchor_y,
            angle = transform.angle,
            size,
            "Overlay placed"
        );

        Some(OverlayPlacement {
            anchor_x: transform.anchor_x,
            anchor_y: transform.anchor_y,
            angle: transform.angle,
            size,
            raw_size: transform.raw_size,
            target_size,
        })
    }
}

impl Default for FramePipeline {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::test_hand;

    fn hand() -> LandmarkSet {
        // Horizontal segment of 0.1 * 1000 px -> raw size 80
        test_hand((0.4, 0.5), (0.5, 0.5))
    }

    fn run_warmup(pipeline: &FramePipeline, state: &mut SmoothingState) {
        for _ in 0..10 {
            pipeline.step(state, Some(&hand()), 1000.0, 1000.0, 1.0);
        }
    }

    #[test]
    fn test_first_frames_follow_target() {
        let pipeline = FramePipeline::default();
        let mut state = SmoothingState::new();

        let p = pipeline.step(&mut state, Some(&hand()), 1000.0, 1000.0, 1.0).unwrap();
        assert!((p.size - 80.0).abs() < 1e-9);

        let p = pipeline.step(&mut state, Some(&hand()), 1000.0, 1000.0, 2.0).unwrap();
        assert!((p.size - 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_manual_scale_is_smoothed_after_warmup() {
        let pipeline = FramePipeline::default();
        let mut state = SmoothingState::new();
        run_warmup(&pipeline, &mut state);

        let p = pipeline.step(&mut state, Some(&hand()), 1000.0, 1000.0, 2.0).unwrap();
        assert!((p.target_size - 160.0).abs() < 1e-9);
        assert!((p.size - (80.0 * 0.6 + 160.0 * 0.4)).abs() < 1e-9);
    }

    #[test]
    fn test_frames_count_without_hand() {
        let pipeline = FramePipeline::default();
        let mut state = SmoothingState::new();

        for _ in 0..4 {
            assert!(pipeline.step(&mut state, None, 640.0, 480.0, 1.0).is_none());
        }
        assert_eq!(state.frame_count(), 4);
        assert_eq!(state.previous_size(), 0.0);
    }

    #[test]
    fn test_reacquisition_bypasses_smoothing() {
        let pipeline = FramePipeline::default();
        let mut state = SmoothingState::new();
        run_warmup(&pipeline, &mut state);

        assert!(pipeline.step(&mut state, None, 1000.0, 1000.0, 1.0).is_none());
        assert_eq!(state.previous_size(), 0.0);

        let p = pipeline.step(&mut state, Some(&hand()), 1000.0, 1000.0, 3.0).unwrap();
        assert_eq!(p.size, p.target_size);
    }
}
