use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tandem_engine::coords::Geometry;
use tandem_engine::device::{GraphicsContext, RenderBackend};
use tandem_engine::draw::DrawList;
use tandem_engine::paint::Color;

/// Progress of the render worker through a request.
///
/// Written only by the worker (release) and read lock-free by the UI thread
/// (acquire).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum RenderPhase {
    Idle = 0,
    Syncing = 1,
    Drawing = 2,
    Done = 3,
}

impl RenderPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => RenderPhase::Syncing,
            2 => RenderPhase::Drawing,
            3 => RenderPhase::Done,
            _ => RenderPhase::Idle,
        }
    }

    /// Syncing or drawing.
    #[inline]
    pub fn in_flight(self) -> bool {
        matches!(self, RenderPhase::Syncing | RenderPhase::Drawing)
    }
}

/// State guarded by the handshake lock.
pub(crate) struct SyncState<B: RenderBackend> {
    /// Serial of the last render whose sync sub-phase finished.
    pub synced_serial: u64,
    /// Set once the worker has handled `Stop` or exited.
    pub stopped: bool,
    /// Presentation area, read by the worker at sync time.
    pub geometry: Geometry,
    /// Draw list polished by the UI thread, copied by the worker at sync time.
    pub staged: DrawList,
    pub clear: Color,
    /// Context in transit between the threads (`Init` takes it, `Stop` returns it).
    pub context: Option<GraphicsContext<B>>,
}

/// Mutex + condition variable pair coordinating the UI thread and the
/// render worker, plus the lock-free phase and the about-to-quit flag.
pub(crate) struct Handshake<B: RenderBackend> {
    state: Mutex<SyncState<B>>,
    cond: Condvar,
    phase: AtomicU8,
    quit: Mutex<bool>,
}

impl<B: RenderBackend> Handshake<B> {
    pub(crate) fn new(clear: Color) -> Self {
        Self {
            state: Mutex::new(SyncState {
                synced_serial: 0,
                stopped: false,
                geometry: Geometry::default(),
                staged: DrawList::new(),
                clear,
                context: None,
            }),
            cond: Condvar::new(),
            phase: AtomicU8::new(RenderPhase::Idle as u8),
            quit: Mutex::new(false),
        }
    }

    /// Locks the handshake state. A panic on the other side does not poison it for us.
    pub(crate) fn lock(&self) -> MutexGuard<'_, SyncState<B>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn notify(&self) {
        self.cond.notify_all();
    }

    /// Blocks until the sync sub-phase of render `serial` completed or the worker stopped.
    pub(crate) fn wait_synced<'a>(
        &self,
        guard: MutexGuard<'a, SyncState<B>>,
        serial: u64,
    ) -> MutexGuard<'a, SyncState<B>> {
        self.cond
            .wait_while(guard, |s| s.synced_serial < serial && !s.stopped)
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn wait_stopped<'a>(
        &self,
        guard: MutexGuard<'a, SyncState<B>>,
    ) -> MutexGuard<'a, SyncState<B>> {
        self.cond
            .wait_while(guard, |s| !s.stopped)
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub(crate) fn set_phase(&self, phase: RenderPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    #[inline]
    pub(crate) fn phase(&self) -> RenderPhase {
        RenderPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn set_about_to_quit(&self) {
        *self.quit_flag() = true;
    }

    /// Held by the worker for the whole draw sub-phase so that setting the
    /// flag waits for a draw already underway.
    pub(crate) fn quit_flag(&self) -> MutexGuard<'_, bool> {
        self.quit.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use tandem_engine::device::RasterBackend;

    use super::*;

    #[test]
    fn phase_round_trips_through_atomic() {
        let h = Handshake::<RasterBackend>::new(Color::BLACK);
        assert_eq!(h.phase(), RenderPhase::Idle);
        h.set_phase(RenderPhase::Drawing);
        assert_eq!(h.phase(), RenderPhase::Drawing);
        assert!(h.phase().in_flight());
        h.set_phase(RenderPhase::Done);
        assert!(!h.phase().in_flight());
    }

    #[test]
    fn waiter_ignores_older_serials() {
        let h = Arc::new(Handshake::<RasterBackend>::new(Color::BLACK));
        let signaller = Arc::clone(&h);
        let t = thread::spawn(move || {
            for serial in 1..=3 {
                thread::sleep(Duration::from_millis(5));
                signaller.lock().synced_serial = serial;
                signaller.notify();
            }
        });

        let guard = h.wait_synced(h.lock(), 3);
        assert_eq!(guard.synced_serial, 3);
        drop(guard);
        t.join().unwrap();
    }

    #[test]
    fn stop_releases_sync_waiters() {
        let h = Arc::new(Handshake::<RasterBackend>::new(Color::BLACK));
        let stopper = Arc::clone(&h);
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            stopper.lock().stopped = true;
            stopper.notify();
        });

        let guard = h.wait_synced(h.lock(), 1);
        assert!(guard.stopped);
        assert_eq!(guard.synced_serial, 0);
        drop(guard);
        t.join().unwrap();
    }
}
