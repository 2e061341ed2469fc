use std::time::Duration;

use tandem_engine::paint::Color;

/// How completed frames reach the UI thread.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum DeliveryMode {
    /// The worker reads the target back into an immutable image.
    #[default]
    Image,
    /// The worker hands over a handle to the target itself; the host blits it.
    SharedTarget,
}

/// Threaded view configuration.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Cadence of the fallback update tick started by `set_source`.
    /// `None` leaves updates purely event-driven.
    pub update_interval: Option<Duration>,
    pub delivery: DeliveryMode,
    /// Color frame targets are cleared to before the scene is drawn.
    pub clear_color: Color,
    /// Name of the render worker thread.
    pub worker_name: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            update_interval: Some(Duration::from_millis(30)),
            delivery: DeliveryMode::Image,
            clear_color: Color::BLACK,
            worker_name: "tandem-render".to_string(),
        }
    }
}
