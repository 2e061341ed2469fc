//! Renderer-agnostic draw stream.
//!
//! Scene items record into a [`DrawList`] during polish on the UI thread; the
//! list is handed to the render worker at sync time and consumed by a
//! [`RenderBackend`](crate::device::RenderBackend) during the draw sub-phase.

mod cmd;
mod key;
mod list;

pub use cmd::{DrawCmd, RectCmd};
pub use key::{SortKey, ZIndex};
pub use list::{DrawItem, DrawList};
