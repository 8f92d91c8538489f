//! Overlay artwork loading
//!
//! Artwork is decoded off the async runtime. The slot keeps the last image
//! that finished loading for the most recently requested URL; a load that
//! completes after a newer request was issued is discarded.

use image::RgbaImage;
use parking_lot::RwLock;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Result, TryOnError};

/// Decoded overlay artwork, immutable once loaded
#[derive(Debug)]
pub struct OverlayImage {
    source: String,
    pixels: RgbaImage,
}

impl OverlayImage {
    /// Wrap already decoded pixels
    pub fn from_pixels(source: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            source: source.into(),
            pixels,
        }
    }

    /// Load from a local path or `file://` URI
    pub async fn load(url: &str) -> Result<Self> {
        let path = resolve_source(url)?;
        let source = url.to_string();

        let pixels = tokio::task::spawn_blocking(move || image::open(&path))
            .await
            .map_err(|e| TryOnError::OverlayLoad(format!("loader task failed: {}", e)))?
            .map_err(|e| TryOnError::OverlayLoad(format!("{}: {}", source, e)))?
            .to_rgba8();

        debug!(
            "Decoded overlay {} ({}x{})",
            source,
            pixels.width(),
            pixels.height()
        );
        Ok(Self { source, pixels })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

fn resolve_source(url: &str) -> Result<PathBuf> {
    if url.is_empty() {
        return Err(TryOnError::OverlayLoad("empty overlay URL".into()));
    }
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if url.contains("://") {
        return Err(TryOnError::OverlayLoad(format!(
            "unsupported overlay URL scheme: {}",
            url
        )));
    }
    Ok(PathBuf::from(url))
}

/// Shared, replaceable overlay artwork
#[derive(Debug, Clone, Default)]
pub struct OverlaySlot {
    current: Arc<RwLock<Option<Arc<OverlayImage>>>>,
    generation: Arc<AtomicU64>,
}

impl OverlaySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Artwork to draw, if any has finished loading
    pub fn current(&self) -> Option<Arc<OverlayImage>> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Load `url` and install it unless a newer load was requested meanwhile
    ///
    /// The request is ordered when this is called, not when the returned
    /// future is first polled. Resolves to `Ok(false)` for a superseded load.
    /// On failure the previous artwork stays in place.
    pub fn load(&self, url: &str) -> impl Future<Output = Result<bool>> + Send + 'static {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let slot = self.clone();
        let url = url.to_string();
        async move { slot.finish_load(&url, generation).await }
    }

    async fn finish_load(&self, url: &str, generation: u64) -> Result<bool> {
        let image = match OverlayImage::load(url).await {
            Ok(image) => image,
            Err(e) => {
                warn!("Overlay {} failed to load: {}", url, e);
                return Err(e);
            }
        };

        let mut current = self.current.write();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!("Discarding superseded overlay {}", url);
            return Ok(false);
        }

        *current = Some(Arc::new(image));
        info!("Overlay ready: {}", url);
        Ok(true)
    }

    /// Install decoded artwork directly
    pub fn install(&self, image: OverlayImage) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        *self.current.write() = Some(Arc::new(image));
    }
}
