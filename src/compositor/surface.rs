//! Drawing surface abstraction
//!
//! A 2D context with canvas semantics: a current transform that new
//! operations post-multiply, a current shadow, and a save/restore stack
//! holding both.

use image::RgbaImage;
use std::ops::{Deref, DerefMut};

use crate::config::ShadowConfig;
use crate::error::Result;

/// Drop shadow applied to subsequent image draws
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    /// Blur radius in pixels (gaussian sigma is half of this)
    pub blur: f64,
    /// RGBA colour
    pub color: [u8; 4],
    /// Horizontal offset in device pixels
    pub offset_x: f64,
    /// Vertical offset in device pixels
    pub offset_y: f64,
}

impl Shadow {
    /// Whether drawing this shadow has any visible effect
    pub fn is_visible(&self) -> bool {
        self.color[3] > 0 && (self.blur > 0.0 || self.offset_x != 0.0 || self.offset_y != 0.0)
    }

    pub fn sigma(&self) -> f32 {
        (self.blur / 2.0) as f32
    }
}

impl From<&ShadowConfig> for Shadow {
    fn from(config: &ShadowConfig) -> Self {
        Self {
            blur: config.blur,
            color: config.color,
            offset_x: config.offset_x,
            offset_y: config.offset_y,
        }
    }
}

impl Default for Shadow {
    fn default() -> Self {
        Self::from(&ShadowConfig::default())
    }
}

/// Target the compositor draws into
pub trait DrawingSurface {
    /// Width in device pixels
    fn width(&self) -> u32;

    /// Height in device pixels
    fn height(&self) -> u32;

    /// Reset every pixel to transparent; ignores the transform
    fn clear(&mut self);

    /// Push transform and shadow
    fn save(&mut self);

    /// Pop transform and shadow; no-op on an empty stack
    fn restore(&mut self);

    fn scale(&mut self, sx: f64, sy: f64);

    fn translate(&mut self, tx: f64, ty: f64);

    /// Rotate clockwise by `angle` radians (y axis points down)
    fn rotate(&mut self, angle: f64);

    fn set_shadow(&mut self, shadow: Option<Shadow>);

    /// Draw `image` stretched over the rectangle `(dx, dy, dw, dh)` in
    /// current user space
    fn draw_image(&mut self, image: &RgbaImage, dx: f64, dy: f64, dw: f64, dh: f64)
        -> Result<()>;
}

/// Saved drawing state, restored when dropped
///
/// Derefs to the surface, so the scope can keep drawing through it. The
/// restore runs on every exit path, including `?` and early returns.
pub struct SavedContext<'a, S: DrawingSurface + ?Sized> {
    surface: &'a mut S,
}

impl<'a, S: DrawingSurface + ?Sized> SavedContext<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        surface.save();
        Self { surface }
    }
}

impl<S: DrawingSurface + ?Sized> Deref for SavedContext<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: DrawingSurface + ?Sized> DerefMut for SavedContext<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: DrawingSurface + ?Sized> Drop for SavedContext<'_, S> {
    fn drop(&mut self) {
        self.surface.restore();
    }
}
