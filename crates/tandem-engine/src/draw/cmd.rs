use crate::coords::Rect;
use crate::paint::Color;

/// Solid rectangle fill.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RectCmd {
    pub rect: Rect,
    pub color: Color,
}

/// Draw commands understood by every backend.
///
/// Adding a variant means adding a matching path to each `RenderBackend::draw`.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Rect(RectCmd),
}
