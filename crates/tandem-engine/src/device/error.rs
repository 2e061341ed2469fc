use std::fmt;
use std::thread::ThreadId;

use super::SurfaceFormat;

/// Reasons a [`GraphicsContext`](super::GraphicsContext) cannot be made current.
///
/// Every variant aborts the render attempt it occurred in; the context stays
/// usable for the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// `make_current` was called from a thread that does not own the context.
    WrongThread { owner: ThreadId, caller: ThreadId },
    /// The offscreen surface was invalidated by the platform.
    SurfaceInvalid,
    FormatMismatch { context: SurfaceFormat, surface: SurfaceFormat },
    DeviceLost(String),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::WrongThread { owner, caller } => {
                write!(f, "context owned by {owner:?} cannot be made current on {caller:?}")
            }
            ContextError::SurfaceInvalid => f.write_str("offscreen surface is no longer valid"),
            ContextError::FormatMismatch { context, surface } => {
                write!(f, "surface format {surface} does not match context format {context}")
            }
            ContextError::DeviceLost(reason) => write!(f, "graphics device lost: {reason}"),
        }
    }
}

impl std::error::Error for ContextError {}

/// High-level response after a swapchain error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}
