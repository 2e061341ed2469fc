use std::sync::Arc;

use anyhow::Result;
use tandem_engine::coords::PixelSize;
use tandem_engine::device::RenderBackend;

use crate::stats::ViewStats;

/// GPU color + depth/stencil target and the size it was created for.
pub(crate) struct FrameTarget<B: RenderBackend> {
    pub size: PixelSize,
    pub inner: B::Target,
}

/// Owns the worker's frame target.
///
/// A target whose size differs from the requested one is destroyed and a new
/// one created; targets are never resized in place.
pub(crate) struct FrameTargetManager<B: RenderBackend> {
    target: Option<FrameTarget<B>>,
    stats: Arc<ViewStats>,
}

impl<B: RenderBackend> FrameTargetManager<B> {
    pub(crate) fn new(stats: Arc<ViewStats>) -> Self {
        Self { target: None, stats }
    }

    /// Returns a target of exactly `size`, creating or recreating it as needed.
    pub(crate) fn ensure(&mut self, backend: &mut B, size: PixelSize) -> Result<&mut FrameTarget<B>> {
        let recreate = match &self.target {
            Some(t) if t.size == size => false,
            Some(t) => {
                log::debug!("frame target {} is stale, recreating at {size}", t.size);
                ViewStats::bump(&self.stats.target_recreations);
                true
            }
            None => true,
        };

        if recreate {
            // Release the old target before allocating its replacement.
            self.target = None;
            let inner = backend.create_target(size)?;
            ViewStats::bump(&self.stats.target_creations);
            log::trace!("frame target created at {size}");
            self.target = Some(FrameTarget { size, inner });
        }

        match self.target.as_mut() {
            Some(t) => Ok(t),
            None => anyhow::bail!("frame target missing after creation"),
        }
    }

    pub(crate) fn current(&self) -> Option<&FrameTarget<B>> {
        self.target.as_ref()
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut FrameTarget<B>> {
        self.target.as_mut()
    }

    pub(crate) fn release(&mut self) {
        if let Some(t) = self.target.take() {
            log::debug!("frame target {} released", t.size);
        }
    }
}
