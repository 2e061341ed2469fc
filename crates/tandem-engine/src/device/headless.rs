use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use image::RgbaImage;

use crate::coords::{PixelSize, Size};
use crate::draw::DrawList;
use crate::paint::Color;
use crate::render::{RectRenderer, RenderCtx, RenderTarget};

use super::{ColorFormat, ContextError, FrameImage, GpuInit, RenderBackend, SurfaceFormat};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Headless wgpu device implementing [`RenderBackend`].
///
/// No window surface is involved: frames render into offscreen color +
/// depth/stencil textures and are read back through a staging buffer.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: SurfaceFormat,
    rects: RectRenderer,
    pending: Vec<wgpu::CommandBuffer>,
    lost: Arc<Mutex<Option<String>>>,
}

/// Color + depth/stencil textures of one frame target.
pub struct GpuTarget {
    size: PixelSize,
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    _depth: wgpu::Texture,
    depth_view: wgpu::TextureView,
}

impl GpuTarget {
    #[inline]
    pub fn size(&self) -> PixelSize {
        self.size
    }
}

/// Texture handle given to the UI thread in shared-target delivery mode.
///
/// Only meaningful to code using the same `wgpu::Device`.
#[derive(Debug, Clone)]
pub struct SharedTexture {
    pub texture: wgpu::Texture,
    pub size: PixelSize,
}

impl WgpuBackend {
    /// Creates a device with no surface attached.
    pub async fn new(init: &GpuInit) -> Result<Self> {
        let opened = init.open_device(&GpuInit::instance(), None, "tandem offscreen device").await?;
        Ok(Self::from_device(opened.device, opened.queue, init.target_format))
    }

    /// Blocking variant of [`new`](Self::new).
    pub fn new_blocking(init: &GpuInit) -> Result<Self> {
        pollster::block_on(Self::new(init))
    }

    /// Builds a backend on an existing device, e.g. the window presenter's,
    /// so shared targets can be sampled directly.
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue, target_format: ColorFormat) -> Self {
        let lost = Arc::new(Mutex::new(None));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            log::error!("wgpu device lost ({reason:?}): {message}");
            *flag.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
        });

        Self {
            device,
            queue,
            format: SurfaceFormat::new(target_format),
            rects: RectRenderer::new(),
            pending: Vec::new(),
            lost,
        }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn texture_format(&self) -> wgpu::TextureFormat {
        self.format.color.to_wgpu()
    }
}

impl RenderBackend for WgpuBackend {
    type Target = GpuTarget;
    type Shared = SharedTexture;

    fn name(&self) -> &'static str {
        "wgpu"
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

    fn create_target(&mut self, size: PixelSize) -> Result<GpuTarget> {
        anyhow::ensure!(!size.is_empty(), "cannot create a {size} frame target");

        let limit = self.device.limits().max_texture_dimension_2d;
        anyhow::ensure!(
            size.width <= limit && size.height <= limit,
            "frame target {size} exceeds the device limit of {limit}"
        );

        let extent = wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        };

        let color = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tandem frame color"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.texture_format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let depth = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tandem frame depth/stencil"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(GpuTarget { size, color, color_view, _depth: depth, depth_view })
    }

    fn draw(
        &mut self,
        target: &mut GpuTarget,
        list: &mut DrawList,
        clear: Color,
        scale: f32,
    ) -> Result<()> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tandem frame encoder"),
            });

        {
            let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tandem clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.r as f64,
                            g: clear.g as f64,
                            b: clear.b as f64,
                            a: clear.a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        let scale = if scale > 0.0 { scale } else { 1.0 };
        let logical_size = Size::new(
            target.size.width as f32 / scale,
            target.size.height as f32 / scale,
        );
        let ctx = RenderCtx::new(&self.device, &self.queue, self.texture_format(), logical_size);
        let mut rt = RenderTarget::new(&mut encoder, &target.color_view);
        self.rects.render(&ctx, &mut rt, list);

        self.pending.push(encoder.finish());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.pending.is_empty() {
            self.queue.submit(self.pending.drain(..));
        }
        Ok(())
    }

    fn grab(&mut self, target: &GpuTarget) -> Result<FrameImage> {
        let PixelSize { width, height } = target.size;
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tandem frame readback"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tandem readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .context("failed to wait for frame readback")?;
        rx.recv()
            .context("readback callback dropped")?
            .context("failed to map frame readback buffer")?;

        let bgra = self.format.color == ColorFormat::Bgra8Unorm;
        let mut out = Vec::with_capacity((unpadded * height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks_exact(padded as usize) {
                for px in row[..unpadded as usize].chunks_exact(4) {
                    let [r, g, b, a] = if bgra { [px[2], px[1], px[0], px[3]] } else { [px[0], px[1], px[2], px[3]] };
                    out.extend_from_slice(&unpremultiply([r, g, b, a]));
                }
            }
        }
        readback.unmap();

        let image = RgbaImage::from_raw(width, height, out)
            .context("readback size does not match the frame target")?;
        Ok(FrameImage::new(image))
    }

    fn share(&self, target: &GpuTarget) -> SharedTexture {
        SharedTexture {
            texture: target.color.clone(),
            size: target.size,
        }
    }
}

/// Targets hold premultiplied color; frame images are straight alpha.
fn unpremultiply(px: [u8; 4]) -> [u8; 4] {
    let a = px[3];
    if a == 255 || a == 0 {
        return if a == 0 { [0, 0, 0, 0] } else { px };
    }
    let un = |c: u8| ((c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8;
    [un(px[0]), un(px[1]), un(px[2]), a]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpremultiply_passes_opaque_through() {
        assert_eq!(unpremultiply([10, 20, 30, 255]), [10, 20, 30, 255]);
    }

    #[test]
    fn unpremultiply_half_alpha() {
        assert_eq!(unpremultiply([64, 0, 128, 128]), [128, 0, 255, 128]);
    }

    #[test]
    fn unpremultiply_transparent_is_zero() {
        assert_eq!(unpremultiply([3, 3, 3, 0]), [0, 0, 0, 0]);
    }
}
