use std::fmt;

/// Color channel layout of a render target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum ColorFormat {
    #[default]
    Rgba8Unorm,
    Bgra8Unorm,
}

impl ColorFormat {
    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            ColorFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            ColorFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        }
    }
}

/// Pixel format shared by a graphics context and the surfaces it may be
/// made current on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SurfaceFormat {
    pub color: ColorFormat,
    pub depth_bits: u8,
    pub stencil_bits: u8,
}

impl SurfaceFormat {
    pub const fn new(color: ColorFormat) -> Self {
        Self { color, depth_bits: 24, stencil_bits: 8 }
    }
}

impl Default for SurfaceFormat {
    fn default() -> Self {
        Self::new(ColorFormat::Rgba8Unorm)
    }
}

impl fmt::Display for SurfaceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} d{} s{}", self.color, self.depth_bits, self.stencil_bits)
    }
}
