use winit::dpi::PhysicalPosition;
use winit::event::{
    ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, TouchPhase, WindowEvent,
};
use winit::keyboard::ModifiersState;
use winit::window::Window;

use crate::coords::Vec2;
use crate::input::{
    HostInput, InputState, Modifiers, MouseButton, PointerEvent, PointerKind, ScrollPhase,
    WheelEvent,
};

/// One winit `LineDelta` step, in eighths of a degree.
const ANGLE_PER_LINE: f32 = 120.0;

/// Updates `state` from a winit `WindowEvent` and returns the pointer or
/// wheel event it represents, in window-local logical pixels.
///
/// Events that only change state (modifiers, focus, window moves) return `None`.
pub fn translate_window_event(
    window: &Window,
    state: &mut InputState,
    event: &WindowEvent,
) -> Option<HostInput> {
    match event {
        WindowEvent::ModifiersChanged(m) => {
            state.modifiers = map_modifiers(m.state());
            None
        }

        WindowEvent::Focused(f) => {
            state.set_focused(*f);
            None
        }

        WindowEvent::Moved(pos) => {
            state.window_origin = to_logical(window, PhysicalPosition::new(pos.x as f64, pos.y as f64));
            None
        }

        WindowEvent::CursorLeft { .. } => {
            state.pointer_pos = None;
            None
        }

        WindowEvent::CursorMoved { position, .. } => {
            let local = to_logical(window, *position);
            state.pointer_pos = Some(local);
            Some(HostInput::Pointer(PointerEvent {
                kind: PointerKind::Move,
                position: local,
                global: state.global(local),
                button: None,
                buttons: state.buttons,
                modifiers: state.modifiers,
            }))
        }

        WindowEvent::MouseInput { state: st, button, .. } => {
            let button = map_mouse_button(*button);
            let kind = match st {
                ElementState::Pressed => {
                    state.press(button);
                    PointerKind::Press
                }
                ElementState::Released => {
                    state.release(button);
                    PointerKind::Release
                }
            };

            // winit 0.30 has no cursor query; use the tracked position.
            let local = state.pointer_or_zero();
            Some(HostInput::Pointer(PointerEvent {
                kind,
                position: local,
                global: state.global(local),
                button: Some(button),
                buttons: state.buttons,
                modifiers: state.modifiers,
            }))
        }

        WindowEvent::MouseWheel { delta, phase, .. } => {
            let (pixel_delta, angle_delta) = match delta {
                MouseScrollDelta::LineDelta(x, y) => {
                    (Vec2::zero(), Vec2::new(x * ANGLE_PER_LINE, y * ANGLE_PER_LINE))
                }
                MouseScrollDelta::PixelDelta(p) => {
                    let px = to_logical(window, *p);
                    (px, px)
                }
            };
            let local = state.pointer_or_zero();
            Some(HostInput::Wheel(WheelEvent {
                position: local,
                global: state.global(local),
                pixel_delta,
                angle_delta,
                buttons: state.buttons,
                modifiers: state.modifiers,
                phase: map_phase(*phase),
                inverted: false,
            }))
        }

        _ => None,
    }
}

/// Seeds `state.window_origin` from the window's current position.
pub fn sync_window_origin(window: &Window, state: &mut InputState) {
    if let Ok(pos) = window.inner_position() {
        state.window_origin = to_logical(window, PhysicalPosition::new(pos.x as f64, pos.y as f64));
    }
}

fn to_logical(window: &Window, pos: PhysicalPosition<f64>) -> Vec2 {
    let logical = pos.to_logical::<f64>(window.scale_factor());
    Vec2::new(logical.x as f32, logical.y as f32)
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

fn map_phase(p: TouchPhase) -> ScrollPhase {
    match p {
        TouchPhase::Started => ScrollPhase::Started,
        TouchPhase::Moved => ScrollPhase::Moved,
        TouchPhase::Ended | TouchPhase::Cancelled => ScrollPhase::Ended,
    }
}
