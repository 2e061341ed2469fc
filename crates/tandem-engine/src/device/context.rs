use std::thread::{self, ThreadId};

use super::{ContextError, OffscreenSurface, RenderBackend};

/// GPU context token with explicit thread affinity.
///
/// Exactly one thread owns the context at a time. Only the owner may make it
/// current, and ownership moves only through [`move_to_thread`](Self::move_to_thread),
/// called by the owner while the context is not current. Breaking either
/// rule is a programming error and panics.
pub struct GraphicsContext<B: RenderBackend> {
    backend: B,
    owner: ThreadId,
    /// Id of the surface the context is current on.
    current: Option<u64>,
}

impl<B: RenderBackend> GraphicsContext<B> {
    /// Creates a context owned by the calling thread.
    pub fn new(backend: B) -> Self {
        log::debug!("graphics context created ({} backend)", backend.name());
        Self {
            backend,
            owner: thread::current().id(),
            current: None,
        }
    }

    #[inline]
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    #[inline]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    #[inline]
    pub fn format(&self) -> super::SurfaceFormat {
        self.backend.format()
    }

    /// True when current on some surface and the caller is the owner.
    #[inline]
    pub fn is_current(&self) -> bool {
        self.current.is_some() && self.owner == thread::current().id()
    }

    pub fn make_current(&mut self, surface: &OffscreenSurface) -> Result<(), ContextError> {
        let caller = thread::current().id();
        if caller != self.owner {
            return Err(ContextError::WrongThread { owner: self.owner, caller });
        }

        self.current = None;

        if !surface.is_valid() {
            return Err(ContextError::SurfaceInvalid);
        }
        let format = self.backend.format();
        if surface.format() != format {
            return Err(ContextError::FormatMismatch { context: format, surface: surface.format() });
        }
        self.backend.check_device()?;

        self.current = Some(surface.id());
        Ok(())
    }

    pub fn done_current(&mut self) {
        self.assert_owner("done_current");
        self.current = None;
    }

    /// Hands the context to `thread`.
    ///
    /// # Panics
    /// When called by a thread other than the owner or while current.
    pub fn move_to_thread(&mut self, thread: ThreadId) {
        self.assert_owner("move_to_thread");
        assert!(
            self.current.is_none(),
            "GraphicsContext::move_to_thread while current; call done_current first"
        );
        log::trace!("graphics context moved {:?} -> {:?}", self.owner, thread);
        self.owner = thread;
    }

    /// The backend, for use while current.
    ///
    /// # Panics
    /// When the context is not current on the calling thread.
    pub fn backend(&mut self) -> &mut B {
        assert!(
            self.is_current(),
            "GraphicsContext::backend used while not current on {:?}",
            thread::current().id()
        );
        &mut self.backend
    }

    fn assert_owner(&self, op: &str) {
        let caller = thread::current().id();
        assert_eq!(
            caller, self.owner,
            "GraphicsContext::{op} called on {caller:?}, context is owned by {:?}",
            self.owner
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ColorFormat, RasterBackend, SurfaceFormat};

    fn ctx() -> GraphicsContext<RasterBackend> {
        GraphicsContext::new(RasterBackend::new())
    }

    #[test]
    fn current_on_valid_surface() {
        let mut c = ctx();
        let s = OffscreenSurface::new(c.format());
        c.make_current(&s).unwrap();
        assert!(c.is_current());
        c.done_current();
        assert!(!c.is_current());
    }

    #[test]
    fn invalid_surface_fails() {
        let mut c = ctx();
        let s = OffscreenSurface::new(c.format());
        s.invalidate();
        assert_eq!(c.make_current(&s), Err(ContextError::SurfaceInvalid));
        assert!(!c.is_current());
    }

    #[test]
    fn format_mismatch_fails() {
        let mut c = ctx();
        let s = OffscreenSurface::new(SurfaceFormat::new(ColorFormat::Bgra8Unorm));
        assert!(matches!(c.make_current(&s), Err(ContextError::FormatMismatch { .. })));
    }

    #[test]
    fn lost_device_fails() {
        let backend = RasterBackend::new();
        let loss = backend.device_loss();
        let mut c = GraphicsContext::new(backend);
        let s = OffscreenSurface::new(c.format());
        loss.trigger("reset");
        assert_eq!(c.make_current(&s), Err(ContextError::DeviceLost("reset".into())));
    }

    #[test]
    fn wrong_thread_cannot_make_current() {
        let mut c = ctx();
        let s = OffscreenSurface::new(c.format());
        let err = std::thread::spawn(move || c.make_current(&s)).join().unwrap();
        assert!(matches!(err, Err(ContextError::WrongThread { .. })));
    }

    #[test]
    fn moved_context_works_on_new_thread_and_comes_back() {
        let mut c = ctx();
        let s = OffscreenSurface::new(c.format());
        let home = std::thread::current().id();

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = std::thread::spawn(move || {
            let mut c: GraphicsContext<RasterBackend> = rx.recv().unwrap();
            c.make_current(&s).unwrap();
            c.done_current();
            c.move_to_thread(home);
            c
        });
        c.move_to_thread(worker.thread().id());
        tx.send(c).unwrap();

        let mut c = worker.join().unwrap();
        assert_eq!(c.owner(), home);
        c.done_current();
    }

    #[test]
    #[should_panic(expected = "while current")]
    fn move_while_current_panics() {
        let mut c = ctx();
        let s = OffscreenSurface::new(c.format());
        c.make_current(&s).unwrap();
        c.move_to_thread(std::thread::current().id());
    }

    #[test]
    #[should_panic(expected = "not current")]
    fn backend_requires_current() {
        let mut c = ctx();
        let _ = c.backend();
    }
}
