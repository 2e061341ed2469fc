//! wgpu renderers.
//!
//! Convention:
//! - CPU geometry is in logical pixels (top-left origin, +Y down)
//! - vertex shaders convert to NDC from the logical target size
//! - colors are premultiplied

mod blit;
mod common;
mod ctx;
mod rect;

pub use blit::{BlitRenderer, BlitSource};
pub use ctx::{RenderCtx, RenderTarget};
pub use rect::RectRenderer;
