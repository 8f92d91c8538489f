//! Software drawing surface
//!
//! Rasterizes into an in-memory RGBA framebuffer. Images are drawn by
//! inverse-mapping every covered device pixel back into the source image
//! (nearest sample) and blending source-over. Shadows are rendered into a
//! side layer, blurred, offset in device space, then blended under the image.

use image::{imageops, Rgba, RgbaImage};
use nalgebra::{Matrix3, Point2, Vector2};
use tracing::{info, trace};

use super::surface::{DrawingSurface, Shadow};
use crate::error::Result;

#[derive(Debug, Clone, Copy)]
struct DrawState {
    transform: Matrix3<f64>,
    shadow: Option<Shadow>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Matrix3::identity(),
            shadow: None,
        }
    }
}

/// Software surface
pub struct SoftwareSurface {
    /// Target framebuffer
    framebuffer: RgbaImage,

    /// Current transform and shadow
    state: DrawState,

    /// Saved states
    stack: Vec<DrawState>,

    /// Clear colour
    background_color: [u8; 4],
}

impl SoftwareSurface {
    /// Create new software surface
    pub fn new(width: u32, height: u32) -> Self {
        info!("Creating software surface: {}x{}", width, height);

        Self {
            framebuffer: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0])),
            state: DrawState::default(),
            stack: Vec::new(),
            background_color: [0, 0, 0, 0], // Transparent
        }
    }

    /// Get framebuffer reference
    pub fn framebuffer(&self) -> &RgbaImage {
        &self.framebuffer
    }

    /// Copy of the current framebuffer
    pub fn snapshot(&self) -> RgbaImage {
        self.framebuffer.clone()
    }

    /// Current user-to-device transform
    pub fn transform(&self) -> Matrix3<f64> {
        self.state.transform
    }

    pub fn save_depth(&self) -> usize {
        self.stack.len()
    }

    fn bounds(&self) -> PixelRect {
        PixelRect {
            x0: 0,
            y0: 0,
            x1: i64::from(self.framebuffer.width()),
            y1: i64::from(self.framebuffer.height()),
        }
    }

    fn draw_shadow(&mut self, sampler: &Sampler<'_>, covered: PixelRect, shadow: Shadow) {
        let sigma = shadow.sigma();
        let pad = if sigma > 0.0 {
            (3.0 * f64::from(sigma)).ceil() as i64
        } else {
            0
        };
        let ox = shadow.offset_x.round() as i64;
        let oy = shadow.offset_y.round() as i64;

        // Only layer pixels that can reach the framebuffer after blur and offset
        let reachable = self.bounds().translate(-ox, -oy).expand(pad);
        let Some(layer_rect) = covered.expand(pad).intersect(&reachable) else {
            return;
        };

        let [r, g, b, a] = shadow.color;
        let mut layer = RgbaImage::from_pixel(
            layer_rect.width() as u32,
            layer_rect.height() as u32,
            Rgba([r, g, b, 0]),
        );

        for (lx, ly, pixel) in layer.enumerate_pixels_mut() {
            let x = (layer_rect.x0 + i64::from(lx)) as f64 + 0.5;
            let y = (layer_rect.y0 + i64::from(ly)) as f64 + 0.5;
            if let Some(src) = sampler.sample(x, y) {
                pixel.0[3] = ((u32::from(a) * u32::from(src.0[3]) + 127) / 255) as u8;
            }
        }

        if sigma > 0.0 {
            layer = imageops::blur(&layer, sigma);
        }

        let target = layer_rect.translate(ox, oy);
        let Some(visible) = target.intersect(&self.bounds()) else {
            return;
        };
        for y in visible.y0..visible.y1 {
            for x in visible.x0..visible.x1 {
                let src = *layer.get_pixel((x - target.x0) as u32, (y - target.y0) as u32);
                blend_over(self.framebuffer.get_pixel_mut(x as u32, y as u32), src);
            }
        }
    }
}

impl DrawingSurface for SoftwareSurface {
    fn width(&self) -> u32 {
        self.framebuffer.width()
    }

    fn height(&self) -> u32 {
        self.framebuffer.height()
    }

    fn clear(&mut self) {
        let background = Rgba(self.background_color);
        for pixel in self.framebuffer.pixels_mut() {
            *pixel = background;
        }
    }

    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        match self.stack.pop() {
            Some(state) => self.state = state,
            None => trace!("restore() without matching save()"),
        }
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.state.transform *= Matrix3::new_nonuniform_scaling(&Vector2::new(sx, sy));
    }

    fn translate(&mut self, tx: f64, ty: f64) {
        self.state.transform *= Matrix3::new_translation(&Vector2::new(tx, ty));
    }

    fn rotate(&mut self, angle: f64) {
        self.state.transform *= Matrix3::new_rotation(angle);
    }

    fn set_shadow(&mut self, shadow: Option<Shadow>) {
        self.state.shadow = shadow;
    }

    fn draw_image(
        &mut self,
        image: &RgbaImage,
        dx: f64,
        dy: f64,
        dw: f64,
        dh: f64,
    ) -> Result<()> {
        if !(dw > 0.0 && dh > 0.0 && dw.is_finite() && dh.is_finite())
            || image.width() == 0
            || image.height() == 0
        {
            trace!("Skipping empty draw: {}x{}", dw, dh);
            return Ok(());
        }

        let Some(sampler) = Sampler::new(&self.state.transform, image, dx, dy, dw, dh) else {
            trace!("Skipping draw under degenerate transform");
            return Ok(());
        };
        let covered = sampler.device_bounds();

        if let Some(shadow) = self.state.shadow.filter(Shadow::is_visible) {
            self.draw_shadow(&sampler, covered, shadow);
        }

        let Some(visible) = covered.intersect(&self.bounds()) else {
            return Ok(());
        };
        for y in visible.y0..visible.y1 {
            for x in visible.x0..visible.x1 {
                if let Some(src) = sampler.sample(x as f64 + 0.5, y as f64 + 0.5) {
                    blend_over(self.framebuffer.get_pixel_mut(x as u32, y as u32), src);
                }
            }
        }

        Ok(())
    }
}

/// Integer pixel rectangle, end-exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl PixelRect {
    fn width(&self) -> i64 {
        self.x1 - self.x0
    }

    fn height(&self) -> i64 {
        self.y1 - self.y0
    }

    fn expand(&self, pad: i64) -> Self {
        Self {
            x0: self.x0 - pad,
            y0: self.y0 - pad,
            x1: self.x1 + pad,
            y1: self.y1 + pad,
        }
    }

    fn translate(&self, dx: i64, dy: i64) -> Self {
        Self {
            x0: self.x0 + dx,
            y0: self.y0 + dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }

    fn intersect(&self, other: &Self) -> Option<Self> {
        let rect = Self {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };
        (rect.width() > 0 && rect.height() > 0).then_some(rect)
    }
}

/// Maps device pixels back into a source image
struct Sampler<'a> {
    image: &'a RgbaImage,
    forward: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl<'a> Sampler<'a> {
    fn new(
        transform: &Matrix3<f64>,
        image: &'a RgbaImage,
        dx: f64,
        dy: f64,
        dw: f64,
        dh: f64,
    ) -> Option<Self> {
        let (iw, ih) = image.dimensions();
        let placement = Matrix3::new_translation(&Vector2::new(dx, dy))
            * Matrix3::new_nonuniform_scaling(&Vector2::new(dw / f64::from(iw), dh / f64::from(ih)));
        let forward = *transform * placement;
        let inverse = forward.try_inverse()?;
        Some(Self {
            image,
            forward,
            inverse,
        })
    }

    fn device_bounds(&self) -> PixelRect {
        let (iw, ih) = self.image.dimensions();
        let (iw, ih) = (f64::from(iw), f64::from(ih));
        let corners = [(0.0, 0.0), (iw, 0.0), (0.0, ih), (iw, ih)]
            .map(|(u, v)| self.forward.transform_point(&Point2::new(u, v)));

        let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

        PixelRect {
            x0: min_x.floor() as i64,
            y0: min_y.floor() as i64,
            x1: max_x.ceil() as i64,
            y1: max_y.ceil() as i64,
        }
    }

    fn sample(&self, x: f64, y: f64) -> Option<Rgba<u8>> {
        let p = self.inverse.transform_point(&Point2::new(x, y));
        let (u, v) = (p.x.floor(), p.y.floor());
        let (iw, ih) = self.image.dimensions();
        if u < 0.0 || v < 0.0 || u >= f64::from(iw) || v >= f64::from(ih) {
            return None;
        }
        Some(*self.image.get_pixel(u as u32, v as u32))
    }
}

/// Source-over blend of non-premultiplied RGBA
fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = f32::from(src.0[3]) / 255.0;
    if sa <= 0.0 {
        return;
    }
    if sa >= 1.0 {
        *dst = src;
        return;
    }

    let da = f32::from(dst.0[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let blended =
            (f32::from(src.0[c]) * sa + f32::from(dst.0[c]) * da * (1.0 - sa)) / out_a;
        dst.0[c] = blended.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
