//! GPU device layer.
//!
//! - [`GraphicsContext`]: thread-affine owner of a [`RenderBackend`]
//! - [`OffscreenSurface`]: window-less surface a context is made current on
//! - [`WgpuBackend`] (headless wgpu device) and [`RasterBackend`] (CPU)
//! - [`WindowGpu`]: swapchain presentation for host windows

mod backend;
mod context;
mod error;
mod format;
mod frame;
mod headless;
mod init;
mod raster;
mod surface;
mod window;

pub use backend::RenderBackend;
pub use context::GraphicsContext;
pub use error::{ContextError, SurfaceErrorAction};
pub use format::{ColorFormat, SurfaceFormat};
pub use frame::FrameImage;
pub use headless::{GpuTarget, SharedTexture, WgpuBackend};
pub use init::GpuInit;
pub use raster::{DeviceLoss, RasterBackend, RasterShared, RasterTarget};
pub use surface::OffscreenSurface;
pub use window::{GpuFrame, WindowGpu};
