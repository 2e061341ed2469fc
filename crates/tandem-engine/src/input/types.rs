use crate::coords::Vec2;

/// Mouse button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

impl MouseButton {
    fn bit(self) -> u8 {
        match self {
            MouseButton::Left => 1 << 0,
            MouseButton::Right => 1 << 1,
            MouseButton::Middle => 1 << 2,
            MouseButton::Back => 1 << 3,
            MouseButton::Forward => 1 << 4,
            MouseButton::Other(_) => 1 << 5,
        }
    }
}

/// Set of held mouse buttons. `Other(_)` buttons share a single slot.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Buttons(u8);

impl Buttons {
    pub const NONE: Buttons = Buttons(0);

    #[inline]
    pub fn contains(self, b: MouseButton) -> bool {
        self.0 & b.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, b: MouseButton) {
        self.0 |= b.bit();
    }

    #[inline]
    pub fn remove(&mut self, b: MouseButton) {
        self.0 &= !b.bit();
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn with(mut self, b: MouseButton) -> Self {
        self.insert(b);
        self
    }
}

/// Modifier keys state.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PointerKind {
    Press,
    Release,
    Move,
}

/// Pointer press/release/move.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub position: Vec2,
    pub global: Vec2,
    /// Button that changed state; `None` for moves.
    pub button: Option<MouseButton>,
    /// Buttons held after this event.
    pub buttons: Buttons,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Same event with `position` shifted by `-origin`; `global` is untouched.
    #[inline]
    pub fn remapped(self, origin: Vec2) -> Self {
        Self { position: self.position - origin, ..self }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ScrollPhase {
    #[default]
    NoPhase,
    Started,
    Moved,
    Ended,
}

/// Wheel / touchpad scroll.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WheelEvent {
    pub position: Vec2,
    pub global: Vec2,
    /// High-precision delta in logical pixels, when the device provides one.
    pub pixel_delta: Vec2,
    /// Wheel rotation in eighths of a degree (one notch = 120).
    pub angle_delta: Vec2,
    pub buttons: Buttons,
    pub modifiers: Modifiers,
    pub phase: ScrollPhase,
    /// True when the platform reports "natural" scrolling.
    pub inverted: bool,
}

impl WheelEvent {
    #[inline]
    pub fn remapped(self, origin: Vec2) -> Self {
        Self { position: self.position - origin, ..self }
    }
}

/// Input a host window feeds into the view.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum HostInput {
    Pointer(PointerEvent),
    Wheel(WheelEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_set_tracks_membership() {
        let mut b = Buttons::NONE.with(MouseButton::Left);
        b.insert(MouseButton::Middle);
        assert!(b.contains(MouseButton::Left));
        assert!(!b.contains(MouseButton::Right));
        b.remove(MouseButton::Left);
        b.remove(MouseButton::Middle);
        assert!(b.is_empty());
    }

    #[test]
    fn remap_keeps_global() {
        let ev = PointerEvent {
            kind: PointerKind::Press,
            position: Vec2::new(110.0, 60.0),
            global: Vec2::new(910.0, 460.0),
            button: Some(MouseButton::Left),
            buttons: Buttons::NONE.with(MouseButton::Left),
            modifiers: Modifiers::default(),
        };
        let local = ev.remapped(Vec2::new(100.0, 50.0));
        assert_eq!(local.position, Vec2::new(10.0, 10.0));
        assert_eq!(local.global, ev.global);
    }
}
