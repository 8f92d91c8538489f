//! Video Frame Management
//!
//! Camera frames as delivered to the per-frame callback, plus running
//! statistics for a session.

use image::RgbaImage;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::{Result, TryOnError};

/// Pixel layout of a camera frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit RGBA
    Rgba8,
    /// 8-bit BGRA (typical capture layout)
    Bgra8,
    /// 8-bit RGB, no alpha
    Rgb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Rgba8 | Self::Bgra8 => 4,
            Self::Rgb8 => 3,
        }
    }
}

/// Video frame captured from the camera
#[derive(Clone)]
pub struct VideoFrame {
    /// Monotonic frame identifier within one capture
    pub frame_id: u64,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Row stride in bytes
    pub stride: u32,

    /// Pixel format
    pub format: PixelFormat,

    /// Pixel data (shared between the detector and the compositor)
    pub data: Arc<Vec<u8>>,

    /// Capture timestamp
    pub capture_time: SystemTime,
}

impl VideoFrame {
    /// Create frame with data
    pub fn with_data(
        frame_id: u64,
        width: u32,
        height: u32,
        stride: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Self {
        Self {
            frame_id,
            width,
            height,
            stride,
            format,
            data: Arc::new(data),
            capture_time: SystemTime::now(),
        }
    }

    /// Wrap an RGBA image as a frame
    pub fn from_rgba(frame_id: u64, image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::with_data(
            frame_id,
            width,
            height,
            width * 4,
            PixelFormat::Rgba8,
            image.into_raw(),
        )
    }

    /// Uniformly coloured frame
    pub fn solid(frame_id: u64, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::from_rgba(
            frame_id,
            RgbaImage::from_pixel(width, height, image::Rgba(rgba)),
        )
    }

    /// Get data size
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Check that the buffer covers `height` rows of `stride` bytes
    pub fn is_valid(&self) -> bool {
        let row_bytes = self.width as usize * self.format.bytes_per_pixel();
        self.width > 0
            && self.height > 0
            && self.stride as usize >= row_bytes
            && self.data.len() >= self.stride as usize * (self.height as usize - 1) + row_bytes
    }

    /// Convert to a tightly packed RGBA buffer
    pub fn to_rgba_image(&self) -> Result<RgbaImage> {
        if !self.is_valid() {
            return Err(TryOnError::FrameProcessing(format!(
                "frame {} buffer too small: {} bytes for {}x{} stride {}",
                self.frame_id,
                self.data.len(),
                self.width,
                self.height,
                self.stride
            )));
        }

        let bpp = self.format.bytes_per_pixel();
        let stride = self.stride as usize;
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);

        for y in 0..self.height as usize {
            let row = &self.data[y * stride..y * stride + self.width as usize * bpp];
            match self.format {
                PixelFormat::Rgba8 => out.extend_from_slice(row),
                PixelFormat::Bgra8 => {
                    for px in row.chunks_exact(4) {
                        out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                    }
                }
                PixelFormat::Rgb8 => {
                    for px in row.chunks_exact(3) {
                        out.extend_from_slice(&[px[0], px[1], px[2], 255]);
                    }
                }
            }
        }

        RgbaImage::from_raw(self.width, self.height, out).ok_or_else(|| {
            TryOnError::FrameProcessing(format!("frame {} conversion failed", self.frame_id))
        })
    }
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("frame_id", &self.frame_id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("data_size", &self.data.len())
            .finish()
    }
}

/// Frame statistics for one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Frames delivered to the callback
    pub frames_processed: u64,

    /// Frames on which a hand was detected
    pub frames_with_hand: u64,

    /// Frames whose processing failed and was skipped
    pub frames_faulted: u64,

    /// Faults since the last good frame
    pub consecutive_faults: u32,

    /// Average frame rate
    pub avg_fps: f64,

    /// Last frame timestamp
    pub last_frame_time: Option<SystemTime>,
}

impl FrameStats {
    /// Create new frame statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with a successfully processed frame
    pub fn update(&mut self, frame: &VideoFrame, hand_detected: bool) {
        self.frames_processed += 1;
        self.consecutive_faults = 0;
        if hand_detected {
            self.frames_with_hand += 1;
        }

        if let Some(last_time) = self.last_frame_time {
            if let Ok(elapsed) = frame.capture_time.duration_since(last_time) {
                let interval_secs = elapsed.as_secs_f64();
                if interval_secs > 0.0 {
                    let instant_fps = 1.0 / interval_secs;
                    // Exponential moving average, seeded by the first interval
                    self.avg_fps = if self.avg_fps > 0.0 {
                        self.avg_fps * 0.9 + instant_fps * 0.1
                    } else {
                        instant_fps
                    };
                }
            }
        }

        self.last_frame_time = Some(frame.capture_time);
    }

    /// Record a skipped frame
    pub fn record_fault(&mut self) {
        self.frames_faulted += 1;
        self.consecutive_faults = self.consecutive_faults.saturating_add(1);
    }

    /// Fraction of processed frames with a hand
    pub fn detection_rate(&self) -> f64 {
        if self.frames_processed == 0 {
            0.0
        } else {
            self.frames_with_hand as f64 / self.frames_processed as f64
        }
    }
}
