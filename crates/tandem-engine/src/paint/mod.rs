//! Paint model shared between scene items and render backends.

pub mod color;

pub use color::Color;
