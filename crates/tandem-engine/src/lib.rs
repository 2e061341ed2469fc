//! Tandem engine crate.
//!
//! Geometry, paint, draw lists, input and the GPU device layer shared by the
//! threaded view and the demo host. Nothing in here knows about threads other
//! than [`device::GraphicsContext`], which tracks the thread it belongs to.

pub mod coords;
pub mod device;
pub mod draw;
pub mod input;
pub mod logging;
pub mod paint;
pub mod render;
pub mod time;
