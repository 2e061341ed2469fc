//! Scene host and the scene engine seam.
//!
//! A [`SceneEngine`] loads a document named by a [`SourceLocator`] and
//! instantiates its root object. The [`SceneHost`] owns the engine and the
//! instantiated root on the UI thread; neither ever reaches the render worker,
//! which only sees the [`DrawList`] recorded during polish.

mod diagnostic;
mod document;
mod host;
mod items;
mod locator;

use tandem_engine::coords::Size;
use tandem_engine::draw::DrawList;
use tandem_engine::input::{PointerEvent, WheelEvent};
use tandem_engine::time::FrameTime;

pub use diagnostic::Diagnostic;
pub use document::DocumentEngine;
pub use host::SceneHost;
pub use locator::SourceLocator;

/// Loading progress of a scene engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing loaded yet.
    #[default]
    Null,
    Loading,
    Ready,
    Error(Vec<Diagnostic>),
}

impl LoadState {
    #[inline]
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// Callback an engine invokes, from any thread, once an asynchronous load finishes.
pub struct LoadNotifier(Box<dyn Fn() + Send + Sync>);

impl LoadNotifier {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Box::new(f))
    }

    /// A notifier nobody listens to.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    #[inline]
    pub fn notify(&self) {
        (self.0)()
    }
}

impl std::fmt::Debug for LoadNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LoadNotifier")
    }
}

/// Loads scene documents and instantiates their root object.
pub trait SceneEngine {
    /// Starts loading `source`. Asynchronous engines return [`LoadState::Loading`]
    /// and call `notify` when [`status`](Self::status) changes.
    fn load(&mut self, source: &SourceLocator, notify: LoadNotifier) -> Result<LoadState, Vec<Diagnostic>>;

    fn status(&self) -> LoadState;

    /// Instantiates the loaded document's root.
    fn create(&mut self) -> Result<SceneObject, Vec<Diagnostic>>;
}

/// What instantiating a document produced.
pub enum SceneObject {
    /// A drawable root.
    Item(Box<dyn SceneItem>),
    /// A root object that cannot be drawn.
    Plain { type_name: String },
}

impl std::fmt::Debug for SceneObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneObject::Item(_) => f.write_str("SceneObject::Item(..)"),
            SceneObject::Plain { type_name } => write!(f, "SceneObject::Plain({type_name})"),
        }
    }
}

/// Input delivered to a scene, in scene-local logical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SceneEvent {
    Pointer(PointerEvent),
    Wheel(WheelEvent),
}

/// Result returned by [`SceneItem::handle_input`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Consumed,
    Ignored,
}

impl EventResult {
    #[inline]
    pub fn is_consumed(self) -> bool {
        self == EventResult::Consumed
    }
}

/// A drawable scene root.
///
/// Lives on the UI thread only. The host sizes it to the presentation area,
/// polishes it once per frame and asks it to record its draw commands.
pub trait SceneItem {
    /// Size the document asks for; may be zero.
    fn implicit_size(&self) -> Size;

    fn set_size(&mut self, size: Size);

    fn size(&self) -> Size;

    /// Layout and animation step, run before each render.
    fn polish(&mut self, time: FrameTime);

    fn record(&self, list: &mut DrawList);

    fn handle_input(&mut self, _event: &SceneEvent) -> EventResult {
        EventResult::Ignored
    }

    /// True while the item animates and wants frames without input.
    fn needs_update(&self) -> bool {
        false
    }
}
