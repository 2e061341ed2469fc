use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use image::{Rgba, RgbaImage};

use crate::coords::PixelSize;
use crate::draw::{DrawCmd, DrawList};
use crate::paint::Color;

use super::{ContextError, FrameImage, RenderBackend, SurfaceFormat};

/// CPU rasterizer implementing [`RenderBackend`].
///
/// Rectangles are composited source-over in premultiplied space and stored as
/// straight-alpha RGBA8, so a grabbed frame matches what the wgpu backend reads
/// back for opaque content. Used by hosts without a GPU and by the test suite.
#[derive(Debug)]
pub struct RasterBackend {
    format: SurfaceFormat,
    lost: Arc<Mutex<Option<String>>>,
    pending: usize,
    submitted: u64,
}

/// Backing store of a raster target.
#[derive(Debug)]
pub struct RasterTarget {
    size: PixelSize,
    pixels: Arc<Mutex<RgbaImage>>,
}

impl RasterTarget {
    #[inline]
    pub fn size(&self) -> PixelSize {
        self.size
    }
}

/// UI-side handle to a raster target in shared-target delivery mode.
#[derive(Debug, Clone)]
pub struct RasterShared {
    size: PixelSize,
    pixels: Arc<Mutex<RgbaImage>>,
}

impl RasterShared {
    #[inline]
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Copies the current target contents.
    pub fn snapshot(&self) -> FrameImage {
        let pixels = self.pixels.lock().unwrap_or_else(PoisonError::into_inner);
        FrameImage::new(pixels.clone())
    }
}

/// Switch that simulates a lost device on the backend it came from.
#[derive(Debug, Clone)]
pub struct DeviceLoss {
    lost: Arc<Mutex<Option<String>>>,
}

impl DeviceLoss {
    pub fn trigger(&self, reason: impl Into<String>) {
        *self.lost.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }

    pub fn restore(&self) {
        *self.lost.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl RasterBackend {
    pub fn new() -> Self {
        Self::with_format(SurfaceFormat::default())
    }

    pub fn with_format(format: SurfaceFormat) -> Self {
        Self {
            format,
            lost: Arc::new(Mutex::new(None)),
            pending: 0,
            submitted: 0,
        }
    }

    pub fn device_loss(&self) -> DeviceLoss {
        DeviceLoss { lost: Arc::clone(&self.lost) }
    }

    /// Number of draws submitted through `flush`.
    #[inline]
    pub fn submitted(&self) -> u64 {
        self.submitted
    }
}

impl Default for RasterBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for RasterBackend {
    type Target = RasterTarget;
    type Shared = RasterShared;

    fn name(&self) -> &'static str {
        "raster"
    }

    fn format(&self) -> SurfaceFormat {
        self.format
    }

    fn check_device(&self) -> Result<(), ContextError> {
        match &*self.lost.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(reason) => Err(ContextError::DeviceLost(reason.clone())),
            None => Ok(()),
        }
    }

    fn create_target(&mut self, size: PixelSize) -> Result<RasterTarget> {
        anyhow::ensure!(!size.is_empty(), "cannot create a {size} raster target");
        Ok(RasterTarget {
            size,
            pixels: Arc::new(Mutex::new(RgbaImage::new(size.width, size.height))),
        })
    }

    fn draw(
        &mut self,
        target: &mut RasterTarget,
        list: &mut DrawList,
        clear: Color,
        scale: f32,
    ) -> Result<()> {
        let mut pixels = target.pixels.lock().unwrap_or_else(PoisonError::into_inner);
        let bounds = (target.size.width, target.size.height);

        let clear_px = Rgba(clear.to_rgba8());
        pixels.pixels_mut().for_each(|p| *p = clear_px);

        for item in list.iter_in_paint_order() {
            let DrawCmd::Rect(cmd) = &item.cmd;
            let Some((x0, y0, x1, y1)) = cmd.rect.to_pixel_span(scale, bounds) else {
                continue;
            };

            let src = cmd.color;
            if src.a <= 0.0 {
                continue;
            }
            let opaque = Rgba(src.to_rgba8());

            for y in y0..y1 {
                for x in x0..x1 {
                    let dst = pixels.get_pixel_mut(x, y);
                    *dst = if src.is_opaque() {
                        opaque
                    } else {
                        Rgba(src.over(Color::from_rgba8(dst.0)).to_rgba8())
                    };
                }
            }
        }

        self.pending += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.submitted += self.pending as u64;
        self.pending = 0;
        Ok(())
    }

    fn grab(&mut self, target: &RasterTarget) -> Result<FrameImage> {
        let pixels = target.pixels.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(FrameImage::new(pixels.clone()))
    }

    fn share(&self, target: &RasterTarget) -> RasterShared {
        RasterShared {
            size: target.size,
            pixels: Arc::clone(&target.pixels),
        }
    }
}
