use crate::coords::Size;

/// Device, queue and target description handed to a renderer for one pass.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    /// Format of the color attachment; pipelines are keyed on it.
    pub format: wgpu::TextureFormat,
    /// Target size in logical pixels, the space draw lists are recorded in.
    pub logical_size: Size,
}

impl<'a> RenderCtx<'a> {
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue, format: wgpu::TextureFormat, logical_size: Size) -> Self {
        Self { device, queue, format, logical_size }
    }
}

/// Where a pass records: the frame's encoder and its color attachment.
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
}

impl<'a> RenderTarget<'a> {
    pub fn new(encoder: &'a mut wgpu::CommandEncoder, color_view: &'a wgpu::TextureView) -> Self {
        Self { encoder, color_view }
    }
}
