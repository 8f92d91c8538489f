//! Overlay size smoothing
//!
//! Exponential moving average over the overlay size with a warm-up bypass.
//! The bypass also fires whenever the history is empty, which is how a hand
//! that reappears after being lost snaps to its size instead of growing in.

use crate::config::SmoothingConfig;

/// Smoothing history for one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmoothingState {
    previous_size: f64,
    frame_count: u64,
}

impl SmoothingState {
    /// Fresh session state
    pub fn new() -> Self {
        Self::default()
    }

    /// Last smoothed size (0 = no history)
    pub fn previous_size(&self) -> f64 {
        self.previous_size
    }

    /// Frames processed this session
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Count a frame and return its zero-based index
    pub fn begin_frame(&mut self) -> u64 {
        let index = self.frame_count;
        self.frame_count += 1;
        index
    }
}

/// Size smoothing filter
#[derive(Debug, Clone, Copy)]
pub struct SmoothingFilter {
    alpha: f64,
    warmup_frames: u64,
}

impl SmoothingFilter {
    pub fn new(config: &SmoothingConfig) -> Self {
        Self {
            alpha: config.factor,
            warmup_frames: config.warmup_frames,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Plain moving-average step
    pub fn blend(&self, target: f64, previous: f64) -> f64 {
        previous * self.alpha + target * (1.0 - self.alpha)
    }

    /// Smoothed size for the frame at `frame_index`
    pub fn smooth(&self, target: f64, previous: f64, frame_index: u64) -> f64 {
        if frame_index < self.warmup_frames || previous == 0.0 {
            target
        } else {
            self.blend(target, previous)
        }
    }

    /// Smooth `target` and record it as history
    pub fn filter(&self, state: &mut SmoothingState, frame_index: u64, target: f64) -> f64 {
        let size = self.smooth(target, state.previous_size, frame_index);
        state.previous_size = size;
        size
    }

    /// Drop history so the next detection bypasses smoothing
    pub fn mark_hand_lost(&self, state: &mut SmoothingState) {
        if state.previous_size != 0.0 {
            state.previous_size = 0.0;
        }
    }
}

impl Default for SmoothingFilter {
    fn default() -> Self {
        Self::new(&SmoothingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warmup_bypass() {
        let filter = SmoothingFilter::default();
        for index in 0..10 {
            assert_eq!(filter.smooth(42.0, 100.0, index), 42.0);
        }
        assert!((filter.smooth(40.0, 100.0, 10) - 76.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_history_bypass() {
        let filter = SmoothingFilter::default();
        assert_eq!(filter.smooth(55.5, 0.0, 1_000), 55.5);
    }

    #[test]
    fn test_filter_records_history() {
        let filter = SmoothingFilter::default();
        let mut state = SmoothingState::new();

        let first = filter.filter(&mut state, 20, 50.0);
        assert_eq!(first, 50.0);
        assert_eq!(state.previous_size(), 50.0);

        let second = filter.filter(&mut state, 21, 100.0);
        assert!((second - 70.0).abs() < 1e-12);
        assert_eq!(state.previous_size(), second);
    }

    #[test]
    fn test_loss_resets_history() {
        let filter = SmoothingFilter::default();
        let mut state = SmoothingState::new();
        filter.filter(&mut state, 30, 80.0);

        filter.mark_hand_lost(&mut state);
        assert_eq!(state.previous_size(), 0.0);

        // Reacquisition snaps to the new target
        assert_eq!(filter.filter(&mut state, 31, 20.0), 20.0);
    }

    #[test]
    fn test_begin_frame_counts_from_zero() {
        let mut state = SmoothingState::new();
        assert_eq!(state.begin_frame(), 0);
        assert_eq!(state.begin_frame(), 1);
        assert_eq!(state.frame_count(), 2);
    }
}
