use std::fmt;

use tandem_engine::coords::PixelSize;
use tandem_engine::device::{ContextError, FrameImage};

/// The latest completed frame, as stored by the UI thread.
///
/// `S` is the backend's shared-target handle type.
#[derive(Debug, Clone)]
pub enum PresentedFrame<S> {
    Image(FrameImage),
    Target { shared: S, size: PixelSize },
}

impl<S> PresentedFrame<S> {
    pub fn size(&self) -> PixelSize {
        match self {
            PresentedFrame::Image(image) => image.size(),
            PresentedFrame::Target { size, .. } => *size,
        }
    }

    pub fn image(&self) -> Option<&FrameImage> {
        match self {
            PresentedFrame::Image(image) => Some(image),
            PresentedFrame::Target { .. } => None,
        }
    }
}

/// Why a render request ended without drawing.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    /// `Render` arrived before `Init` handed the worker a context.
    NotInitialized,
    /// The context could not be made current.
    Context(ContextError),
    /// The presentation area has no pixels.
    EmptyArea,
    /// The frame target could not be created.
    Target(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::NotInitialized => f.write_str("render requested before init"),
            AbortReason::Context(err) => write!(f, "context activation failed: {err}"),
            AbortReason::EmptyArea => f.write_str("presentation area is empty"),
            AbortReason::Target(msg) => write!(f, "frame target unavailable: {msg}"),
        }
    }
}

/// Result of one render request, reported back to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Presented,
    /// Synchronized, but the draw was suppressed by `about_to_quit`.
    Skipped,
    Aborted(AbortReason),
    /// Drawing or delivery failed after a successful sync.
    Failed(String),
}
