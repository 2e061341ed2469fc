use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use image::RgbaImage;

use crate::coords::PixelSize;

/// Immutable straight-alpha RGBA8 image of a completed frame.
///
/// Clones share the pixel buffer.
#[derive(Debug, Clone)]
pub struct FrameImage {
    size: PixelSize,
    pixels: Arc<RgbaImage>,
}

impl FrameImage {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            size: PixelSize::new(image.width(), image.height()),
            pixels: Arc::new(image),
        }
    }

    #[inline]
    pub fn size(&self) -> PixelSize {
        self.size
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.size.width && y < self.size.height).then(|| self.pixels.get_pixel(x, y).0)
    }

    #[inline]
    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// True when both handles point at the same pixel buffer.
    #[inline]
    pub fn ptr_eq(&self, other: &FrameImage) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.pixels
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("failed to write frame to {}", path.display()))
    }
}
