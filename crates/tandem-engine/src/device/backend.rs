use anyhow::Result;

use crate::coords::PixelSize;
use crate::draw::DrawList;
use crate::paint::Color;

use super::{ContextError, FrameImage, SurfaceFormat};

/// Seam between the render worker and a concrete graphics API.
///
/// A backend lives inside a [`GraphicsContext`](super::GraphicsContext) and is
/// only reachable while that context is current, so implementations may assume
/// single-threaded use between `make_current` and `done_current`.
pub trait RenderBackend: Send + 'static {
    /// Color + depth/stencil render target. Dropping it releases GPU memory.
    type Target: Send + 'static;

    /// Handle given to the UI thread in shared-target delivery mode.
    type Shared: Clone + Send + 'static;

    fn name(&self) -> &'static str;

    fn format(&self) -> SurfaceFormat;

    /// Called from `make_current`; reports a lost device.
    fn check_device(&self) -> Result<(), ContextError>;

    fn create_target(&mut self, size: PixelSize) -> Result<Self::Target>;

    /// Records the draw list into `target`, cleared to `clear` first.
    ///
    /// `scale` maps the list's logical pixels onto the target's physical pixels.
    fn draw(
        &mut self,
        target: &mut Self::Target,
        list: &mut DrawList,
        clear: Color,
        scale: f32,
    ) -> Result<()>;

    /// Submits recorded work.
    fn flush(&mut self) -> Result<()>;

    /// Reads the target back into an owned image.
    fn grab(&mut self, target: &Self::Target) -> Result<FrameImage>;

    fn share(&self, target: &Self::Target) -> Self::Shared;
}
