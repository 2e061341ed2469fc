//! Platform adapters translating window-system events into [`super::HostInput`].

pub mod winit;
