//! Coordinate and geometry types.
//!
//! Canonical CPU space:
//! - logical pixels (DPI-aware), origin top-left, +X right, +Y down
//! - physical pixels only appear as [`PixelSize`], the size of a frame target
//!
//! Renderers convert logical pixels to NDC against the logical target size.

mod rect;
mod size;
mod vec2;

pub use rect::Rect;
pub use size::{Geometry, PixelSize, Size};
pub use vec2::Vec2;
