//! Input events as delivered by the host window and consumed by a scene.
//!
//! Positions are logical pixels. `position` is relative to whatever
//! coordinate space the event currently lives in (host window first, scene
//! after remapping); `global` is screen-relative and never remapped.

mod state;
mod types;

pub mod platform;

pub use state::InputState;
pub use types::{
    Buttons, HostInput, Modifiers, MouseButton, PointerEvent, PointerKind, ScrollPhase, WheelEvent,
};
