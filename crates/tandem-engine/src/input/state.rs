use crate::coords::Vec2;

use super::types::{Buttons, Modifiers, MouseButton};

/// Input state for one host window.
///
/// Platform events that do not carry the full pointer context (winit's
/// `MouseInput` has no position, for example) are completed from here.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    pub modifiers: Modifiers,
    pub focused: bool,
    /// Pointer position in window-local logical pixels.
    pub pointer_pos: Option<Vec2>,
    /// Window origin in screen logical pixels, used to derive global positions.
    pub window_origin: Vec2,
    pub buttons: Buttons,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn pointer_or_zero(&self) -> Vec2 {
        self.pointer_pos.unwrap_or_default()
    }

    #[inline]
    pub fn global(&self, local: Vec2) -> Vec2 {
        self.window_origin + local
    }

    pub fn press(&mut self, b: MouseButton) -> bool {
        let was = self.buttons.contains(b);
        self.buttons.insert(b);
        !was
    }

    pub fn release(&mut self, b: MouseButton) -> bool {
        let was = self.buttons.contains(b);
        self.buttons.remove(b);
        was
    }

    /// On focus loss held buttons are forgotten so nothing stays stuck.
    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        if !focused {
            self.buttons = Buttons::NONE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_release_report_transitions() {
        let mut s = InputState::new();
        assert!(s.press(MouseButton::Left));
        assert!(!s.press(MouseButton::Left));
        assert!(s.release(MouseButton::Left));
        assert!(!s.release(MouseButton::Left));
    }

    #[test]
    fn focus_loss_clears_buttons() {
        let mut s = InputState::new();
        s.press(MouseButton::Right);
        s.set_focused(false);
        assert!(s.buttons.is_empty());
    }
}
