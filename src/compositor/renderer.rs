//! Try-on frame renderer
//!
//! Draws one composited frame: the camera picture mirrored to fill the
//! surface, then the overlay centred on its anchor.

use tracing::trace;

use super::surface::{DrawingSurface, SavedContext, Shadow};
use crate::capture::VideoFrame;
use crate::config::Config;
use crate::error::Result;
use crate::overlay::{OverlayImage, OverlayPlacement};

/// What a render actually drew
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Camera frame only, no hand on this frame
    FrameOnly,
    /// Hand present but artwork not loaded yet
    OverlayPending,
    /// Camera frame and overlay
    WithOverlay,
}

/// Compositor
#[derive(Debug, Clone)]
pub struct Compositor {
    shadow: Shadow,
    mirror: bool,
}

impl Compositor {
    pub fn new(config: &Config) -> Self {
        Self {
            shadow: Shadow::from(&config.shadow),
            mirror: config.surface.mirror,
        }
    }

    /// Render one frame
    ///
    /// The placement is computed against the surface size, in the camera's
    /// own (unmirrored) coordinates; the mirror applies to the overlay too.
    pub fn render<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        frame: &VideoFrame,
        placement: Option<&OverlayPlacement>,
        overlay: Option<&OverlayImage>,
    ) -> Result<RenderOutcome> {
        let pixels = frame.to_rgba_image()?;

        surface.clear();
        let mut ctx = SavedContext::new(surface);

        let width = f64::from(ctx.width());
        let height = f64::from(ctx.height());
        if self.mirror {
            ctx.scale(-1.0, 1.0);
            ctx.translate(-width, 0.0);
        }
        ctx.draw_image(&pixels, 0.0, 0.0, width, height)?;

        let Some(placement) = placement else {
            return Ok(RenderOutcome::FrameOnly);
        };
        let Some(overlay) = overlay else {
            trace!("Hand on frame {} but overlay not loaded", frame.frame_id);
            return Ok(RenderOutcome::OverlayPending);
        };

        ctx.translate(placement.anchor_x, placement.anchor_y);
        ctx.rotate(placement.angle);
        ctx.set_shadow(Some(self.shadow));

        let half = placement.size / 2.0;
        ctx.draw_image(
            overlay.pixels(),
            -half,
            -half,
            placement.size,
            placement.size,
        )?;

        Ok(RenderOutcome::WithOverlay)
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
