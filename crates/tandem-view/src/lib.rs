//! Threaded scene presentation for tandem.
//!
//! A [`ThreadedView`] keeps the scene on the UI thread and renders it on a
//! dedicated worker. Each frame goes through two sub-phases:
//!
//! - **sync**: the UI thread polishes the scene into a draw list, posts a
//!   render request and blocks until the worker has copied that list and
//!   sized its frame target;
//! - **draw**: the worker draws and flushes on its own, then hands the
//!   finished frame back by value.
//!
//! The graphics context moves to the worker when the view starts and back to
//! the UI thread at [`ThreadedView::shutdown`].

mod config;
mod frame;
mod handshake;
mod message;
mod stats;
mod target;
mod view;
mod worker;

pub mod scene;

pub use config::{DeliveryMode, ViewConfig};
pub use frame::{AbortReason, FrameOutcome, PresentedFrame};
pub use handshake::RenderPhase;
pub use scene::{Diagnostic, DocumentEngine, EventResult, LoadState, SceneEngine, SourceLocator};
pub use stats::{StatsSnapshot, ViewStats};
pub use view::ThreadedView;

pub mod prelude {
    pub use crate::scene::{
        EventResult, LoadNotifier, LoadState, SceneEngine, SceneEvent, SceneItem, SceneObject,
    };
    pub use crate::{DeliveryMode, PresentedFrame, SourceLocator, ThreadedView, ViewConfig};
    pub use tandem_engine::coords::{Geometry, Size, Vec2};
    pub use tandem_engine::device::RasterBackend;
}
