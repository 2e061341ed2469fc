use std::marker::PhantomData;
use std::rc::Rc;

use tandem_engine::coords::Size;
use tandem_engine::draw::DrawList;
use tandem_engine::time::FrameClock;

use super::{
    Diagnostic, EventResult, LoadNotifier, LoadState, SceneEngine, SceneEvent, SceneItem,
    SceneObject, SourceLocator,
};

/// Owns the scene engine and the instantiated root.
///
/// UI-thread only: the host is `!Send`, so neither it nor the root can be
/// handed to the render worker.
pub struct SceneHost {
    engine: Box<dyn SceneEngine>,
    source: Option<SourceLocator>,
    root: Option<Box<dyn SceneItem>>,
    diagnostics: Vec<Diagnostic>,
    /// Set once instantiation failed for the current source; no retries.
    failed: bool,
    size: Size,
    clock: FrameClock,
    _ui_thread_only: PhantomData<Rc<()>>,
}

impl SceneHost {
    pub fn new(engine: Box<dyn SceneEngine>) -> Self {
        Self {
            engine,
            source: None,
            root: None,
            diagnostics: Vec::new(),
            failed: false,
            size: Size::zero(),
            clock: FrameClock::new(),
            _ui_thread_only: PhantomData,
        }
    }

    /// Starts loading `source`, dropping any previous root.
    pub fn load(&mut self, source: SourceLocator, notify: LoadNotifier) -> LoadState {
        log::debug!("loading scene from {source}");
        self.root = None;
        self.diagnostics.clear();
        self.failed = false;

        let state = match self.engine.load(&source, notify) {
            Ok(state) => state,
            Err(diags) => LoadState::Error(diags),
        };
        self.source = Some(source);

        if let LoadState::Error(diags) = &state {
            self.fail(diags.clone());
        }
        state
    }

    pub fn status(&self) -> LoadState {
        if self.source.is_none() {
            return LoadState::Null;
        }
        self.engine.status()
    }

    /// Instantiates the root once the engine is ready.
    ///
    /// Returns true when a root exists after the call. A failed instantiation
    /// records diagnostics, leaves no partial root behind, and is not retried
    /// until the next [`load`](Self::load).
    pub fn instantiate(&mut self) -> bool {
        if self.root.is_some() {
            return true;
        }
        if self.failed || self.source.is_none() {
            return false;
        }

        match self.engine.status() {
            LoadState::Ready => {}
            LoadState::Error(diags) => {
                self.fail(diags);
                return false;
            }
            LoadState::Null | LoadState::Loading => return false,
        }

        match self.engine.create() {
            Ok(SceneObject::Item(mut item)) => {
                item.set_size(self.size);
                let implicit = item.implicit_size();
                log::debug!(
                    "scene root instantiated (implicit {}x{}, presented at {}x{})",
                    implicit.width,
                    implicit.height,
                    self.size.width,
                    self.size.height
                );
                self.clock.reset();
                self.root = Some(item);
                true
            }
            Ok(SceneObject::Plain { type_name }) => {
                let location = self.source.as_ref().map(SourceLocator::display_name).unwrap_or_default();
                self.fail(vec![Diagnostic::new(
                    location,
                    format!("root object `{type_name}` is not a drawable item"),
                )]);
                false
            }
            Err(diags) => {
                self.fail(diags);
                false
            }
        }
    }

    fn fail(&mut self, diags: Vec<Diagnostic>) {
        for d in &diags {
            log::warn!("scene: {d}");
        }
        self.diagnostics = diags;
        self.failed = true;
        self.root = None;
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.root.is_some()
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn source(&self) -> Option<&SourceLocator> {
        self.source.as_ref()
    }

    /// Sizes the root to the presentation area.
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
        if let Some(root) = self.root.as_mut() {
            root.set_size(size);
        }
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    /// The root's own requested size, once instantiated.
    pub fn implicit_size(&self) -> Option<Size> {
        self.root.as_ref().map(|r| r.implicit_size())
    }

    /// Advances animations and re-records the scene into `list`.
    pub fn polish(&mut self, list: &mut DrawList) {
        list.clear();
        let Some(root) = self.root.as_mut() else { return };
        let time = self.clock.tick();
        root.polish(time);
        root.record(list);
    }

    pub fn deliver(&mut self, event: &SceneEvent) -> EventResult {
        match self.root.as_mut() {
            Some(root) => root.handle_input(event),
            None => EventResult::Ignored,
        }
    }

    pub fn needs_update(&self) -> bool {
        self.root.as_ref().is_some_and(|r| r.needs_update())
    }
}

#[cfg(test)]
mod tests {
    use tandem_engine::coords::Rect;
    use tandem_engine::draw::{DrawCmd, ZIndex};
    use tandem_engine::paint::Color;
    use tandem_engine::time::FrameTime;

    use super::*;

    /// Synchronous engine returning a fixed object.
    struct Fixed {
        object: Option<Result<SceneObject, Vec<Diagnostic>>>,
        state: LoadState,
    }

    impl Fixed {
        fn new(object: Result<SceneObject, Vec<Diagnostic>>) -> Self {
            Self { object: Some(object), state: LoadState::Null }
        }
    }

    impl SceneEngine for Fixed {
        fn load(&mut self, _: &SourceLocator, _: LoadNotifier) -> Result<LoadState, Vec<Diagnostic>> {
            self.state = LoadState::Ready;
            Ok(LoadState::Ready)
        }
        fn status(&self) -> LoadState {
            self.state.clone()
        }
        fn create(&mut self) -> Result<SceneObject, Vec<Diagnostic>> {
            self.object.take().unwrap_or_else(|| Err(vec![Diagnostic::new("fixed", "created twice")]))
        }
    }

    #[derive(Default)]
    struct Square {
        size: Size,
    }

    impl SceneItem for Square {
        fn implicit_size(&self) -> Size {
            Size::zero()
        }
        fn set_size(&mut self, size: Size) {
            self.size = size;
        }
        fn size(&self) -> Size {
            self.size
        }
        fn polish(&mut self, _: FrameTime) {}
        fn record(&self, list: &mut DrawList) {
            list.push_rect(ZIndex(0), Rect::new(0.0, 0.0, self.size.width, self.size.height), Color::WHITE);
        }
    }

    fn host(object: Result<SceneObject, Vec<Diagnostic>>) -> SceneHost {
        let mut host = SceneHost::new(Box::new(Fixed::new(object)));
        host.load(SourceLocator::inline(""), LoadNotifier::noop());
        host
    }

    #[test]
    fn root_follows_presentation_size() {
        let mut host = host(Ok(SceneObject::Item(Box::<Square>::default())));
        host.set_size(Size::new(500.0, 300.0));
        assert!(host.instantiate());
        assert_eq!(host.implicit_size(), Some(Size::zero()));

        let mut list = DrawList::new();
        host.polish(&mut list);
        let DrawCmd::Rect(r) = &list.items()[0].cmd;
        assert_eq!(r.rect, Rect::new(0.0, 0.0, 500.0, 300.0));

        host.set_size(Size::new(10.0, 20.0));
        host.polish(&mut list);
        assert_eq!(list.len(), 1);
        let DrawCmd::Rect(r) = &list.items()[0].cmd;
        assert_eq!(r.rect.size.y, 20.0);
    }

    #[test]
    fn plain_root_is_an_instantiation_failure() {
        let mut host = host(Ok(SceneObject::Plain { type_name: "Object".into() }));
        assert!(!host.instantiate());
        assert!(host.is_failed());
        assert!(host.diagnostics()[0].message.contains("not a drawable item"));
        // Not retried.
        assert!(!host.instantiate());
        assert_eq!(host.diagnostics().len(), 1);
    }

    #[test]
    fn create_errors_become_diagnostics() {
        let mut host = host(Err(vec![Diagnostic::new("a", "x"), Diagnostic::new("b", "y")]));
        assert!(!host.instantiate());
        assert_eq!(host.diagnostics().len(), 2);
        assert!(!host.is_ready());

        let mut list = DrawList::new();
        host.polish(&mut list);
        assert!(list.is_empty());
    }
}
