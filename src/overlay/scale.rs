//! Manual scale and size composition
//!
//! The multiplier lives in two places that are always updated together: an
//! atomic slot the frame callback reads without subscribing to anything, and
//! a watch channel the UI renders the percentage readout from.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::config::ManualScaleConfig;

/// Combine the geometric size with the user multiplier
///
/// Bounds are enforced where the multiplier is written, not here.
pub fn compose_target_size(raw_size: f64, manual_scale: f64) -> f64 {
    raw_size * manual_scale
}

struct ScaleInner {
    slot: AtomicU64,
    mirror: watch::Sender<f64>,
    bounds: ManualScaleConfig,
}

/// User-adjustable overlay multiplier
///
/// Cloning yields another handle to the same value.
#[derive(Clone)]
pub struct ManualScale {
    inner: Arc<ScaleInner>,
}

impl ManualScale {
    pub fn new(bounds: ManualScaleConfig) -> Self {
        let initial = bounds.default;
        let (mirror, _) = watch::channel(initial);
        Self {
            inner: Arc::new(ScaleInner {
                slot: AtomicU64::new(initial.to_bits()),
                mirror,
                bounds,
            }),
        }
    }

    /// Current multiplier, as read by the frame path
    pub fn get(&self) -> f64 {
        f64::from_bits(self.inner.slot.load(Ordering::Acquire))
    }

    /// Receiver for UI readout
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.inner.mirror.subscribe()
    }

    pub fn increase(&self) -> f64 {
        let step = self.inner.bounds.step;
        self.update(|current| current + step)
    }

    pub fn decrease(&self) -> f64 {
        let step = self.inner.bounds.step;
        self.update(|current| current - step)
    }

    pub fn reset(&self) -> f64 {
        let default = self.inner.bounds.default;
        self.update(|_| default)
    }

    /// Set an explicit multiplier, clamped to the configured range
    ///
    /// Non-finite values are ignored.
    pub fn set(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.get();
        }
        self.update(|_| value)
    }

    /// Readout such as "150%"
    pub fn percent_label(&self) -> String {
        format!("{:.0}%", self.get() * 100.0)
    }

    pub fn bounds(&self) -> &ManualScaleConfig {
        &self.inner.bounds
    }

    fn update(&self, f: impl FnOnce(f64) -> f64) -> f64 {
        let ManualScaleConfig { min, max, .. } = self.inner.bounds;
        let mut applied = 0.0;

        // The watch lock serializes writers so slot and mirror never disagree
        self.inner.mirror.send_modify(|shown| {
            let current = f64::from_bits(self.inner.slot.load(Ordering::Acquire));
            let next = f(current).max(min).min(max);
            self.inner.slot.store(next.to_bits(), Ordering::Release);
            *shown = next;
            applied = next;
        });

        debug!("Manual scale set to {:.2}", applied);
        applied
    }
}

impl Default for ManualScale {
    fn default() -> Self {
        Self::new(ManualScaleConfig::default())
    }
}

impl std::fmt::Debug for ManualScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScale")
            .field("value", &self.get())
            .field("bounds", &self.inner.bounds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isotropic_target_size() {
        assert_eq!(compose_target_size(100.0, 1.5), 150.0);
        assert_eq!(compose_target_size(100.0, 0.1), 10.0);
    }

    #[test]
    fn test_increase_saturates() {
        let scale = ManualScale::default();
        for _ in 0..100 {
            scale.increase();
        }
        assert_eq!(scale.get(), 3.0);
    }

    #[test]
    fn test_decrease_saturates() {
        let scale = ManualScale::default();
        for _ in 0..100 {
            scale.decrease();
        }
        assert_eq!(scale.get(), 0.1);
    }

    #[test]
    fn test_reset_is_exact() {
        let scale = ManualScale::default();
        scale.increase();
        scale.increase();
        scale.decrease();
        assert_eq!(scale.reset(), 1.0);
        assert_eq!(scale.get(), 1.0);
    }

    #[test]
    fn test_set_clamps_and_ignores_nan() {
        let scale = ManualScale::default();
        assert_eq!(scale.set(10.0), 3.0);
        assert_eq!(scale.set(f64::NAN), 3.0);
        assert_eq!(scale.set(0.0), 0.1);
    }

    #[test]
    fn test_clones_share_value_and_mirror() {
        let scale = ManualScale::default();
        let ui = scale.clone();
        let rx = scale.subscribe();

        ui.set(1.5);

        assert_eq!(scale.get(), 1.5);
        assert_eq!(*rx.borrow(), 1.5);
        assert_eq!(scale.percent_label(), "150%");
    }
}
