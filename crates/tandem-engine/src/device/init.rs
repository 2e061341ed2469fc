use anyhow::{Context, Result};

use super::ColorFormat;

/// Initialization parameters for the wgpu layer.
///
/// Shared by the headless render backend and the window presenter; fields
/// that only concern one of them are ignored by the other.
#[derive(Debug, Clone)]
pub struct GpuInit {
    pub power_preference: wgpu::PowerPreference,

    /// Use the software adapter (e.g. on CI machines without a GPU).
    pub force_fallback_adapter: bool,

    /// Color format of offscreen frame targets.
    pub target_format: ColorFormat,

    /// Prefer an sRGB swapchain format when available.
    ///
    /// Frame images hold encoded bytes, so hosts that blit them unchanged
    /// want this off.
    pub prefer_srgb: bool,

    pub present_mode: wgpu::PresentMode,

    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    /// Hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            target_format: ColorFormat::Rgba8Unorm,
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

/// Adapter plus the device and queue opened on it.
pub(super) struct OpenedDevice {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuInit {
    pub(super) fn instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor { backends: wgpu::Backends::all(), ..Default::default() })
    }

    /// Picks an adapter (compatible with `surface` when given) and opens a device on it.
    pub(super) async fn open_device(
        &self,
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
        label: &'static str,
    ) -> Result<OpenedDevice> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: self.power_preference,
                compatible_surface: surface,
                force_fallback_adapter: self.force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: self.required_features,
                required_limits: self.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let info = adapter.get_info();
        log::info!("{label} on {} ({:?})", info.name, info.backend);
        Ok(OpenedDevice { adapter, device, queue })
    }
}
