//! Operation-recording surface
//!
//! Draws nothing; keeps the ordered list of calls so callers can check what
//! a render did and that every save was restored.

use image::RgbaImage;

use super::surface::{DrawingSurface, Shadow};
use crate::error::Result;

/// One recorded surface call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    Save,
    Restore,
    Scale(f64, f64),
    Translate(f64, f64),
    Rotate(f64),
    SetShadow(Option<Shadow>),
    DrawImage {
        /// Source image size
        source: (u32, u32),
        dx: f64,
        dy: f64,
        dw: f64,
        dh: f64,
    },
}

/// Surface that records calls instead of rasterizing
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    ops: Vec<DrawOp>,
    depth: usize,
    unmatched_restores: usize,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
            depth: 0,
            unmatched_restores: 0,
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Drain recorded operations
    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    /// Current save depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Every save restored and no stray restores
    pub fn is_balanced(&self) -> bool {
        self.depth == 0 && self.unmatched_restores == 0
    }

    /// Number of image draws recorded
    pub fn draw_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::DrawImage { .. }))
            .count()
    }
}

impl DrawingSurface for RecordingSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
    }

    fn save(&mut self) {
        self.depth += 1;
        self.ops.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        if self.depth == 0 {
            self.unmatched_restores += 1;
        } else {
            self.depth -= 1;
        }
        self.ops.push(DrawOp::Restore);
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.ops.push(DrawOp::Scale(sx, sy));
    }

    fn translate(&mut self, tx: f64, ty: f64) {
        self.ops.push(DrawOp::Translate(tx, ty));
    }

    fn rotate(&mut self, angle: f64) {
        self.ops.push(DrawOp::Rotate(angle));
    }

    fn set_shadow(&mut self, shadow: Option<Shadow>) {
        self.ops.push(DrawOp::SetShadow(shadow));
    }

    fn draw_image(
        &mut self,
        image: &RgbaImage,
        dx: f64,
        dy: f64,
        dw: f64,
        dh: f64,
    ) -> Result<()> {
        self.ops.push(DrawOp::DrawImage {
            source: image.dimensions(),
            dx,
            dy,
            dw,
            dh,
        });
        Ok(())
    }
}
