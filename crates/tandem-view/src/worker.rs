//! The render worker: a dedicated thread running the Init / Render / Resize /
//! Stop state machine.

use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use tandem_engine::device::{GraphicsContext, OffscreenSurface, RenderBackend};
use tandem_engine::draw::DrawList;
use tandem_engine::paint::Color;

use crate::config::DeliveryMode;
use crate::frame::{AbortReason, FrameOutcome, PresentedFrame};
use crate::handshake::{Handshake, RenderPhase, SyncState};
use crate::message::{UiMessage, UiPost, WorkerRequest};
use crate::stats::ViewStats;
use crate::target::FrameTargetManager;

/// Everything the worker needs, assembled on the UI thread.
pub(crate) struct WorkerParts<B: RenderBackend> {
    pub handshake: Arc<Handshake<B>>,
    pub surface: OffscreenSurface,
    pub ui: UiPost<B::Shared>,
    pub ui_thread: ThreadId,
    pub delivery: DeliveryMode,
    pub stats: Arc<ViewStats>,
}

/// UI-side handle to a running worker.
pub(crate) struct WorkerHandle {
    tx: Sender<WorkerRequest>,
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    #[inline]
    pub(crate) fn thread_id(&self) -> ThreadId {
        self.thread.thread().id()
    }

    /// Posts a request. Returns false when the worker is gone.
    pub(crate) fn post(&self, req: WorkerRequest) -> bool {
        self.tx.send(req).is_ok()
    }

    pub(crate) fn join(self) {
        drop(self.tx);
        if self.thread.join().is_err() {
            log::error!("render worker panicked");
        }
    }
}

pub(crate) fn spawn<B: RenderBackend>(name: &str, parts: WorkerParts<B>) -> Result<WorkerHandle> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let thread = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || RenderWorker::new(parts).run(rx))
        .with_context(|| format!("failed to spawn render worker {name:?}"))?;
    Ok(WorkerHandle { tx, thread })
}

/// Marks the handshake stopped and tells the UI thread when the worker
/// leaves its loop for any reason, unwinding included.
struct ExitGuard<B: RenderBackend> {
    handshake: Arc<Handshake<B>>,
    ui: UiPost<B::Shared>,
}

impl<B: RenderBackend> Drop for ExitGuard<B> {
    fn drop(&mut self) {
        if thread::panicking() {
            log::error!("render worker unwinding");
        }
        self.handshake.set_phase(RenderPhase::Idle);
        self.handshake.lock().stopped = true;
        self.handshake.notify();
        self.ui.post(UiMessage::WorkerExited);
    }
}

struct RenderWorker<B: RenderBackend> {
    handshake: Arc<Handshake<B>>,
    surface: OffscreenSurface,
    ui: UiPost<B::Shared>,
    ui_thread: ThreadId,
    delivery: DeliveryMode,
    stats: Arc<ViewStats>,

    context: Option<GraphicsContext<B>>,
    targets: FrameTargetManager<B>,
    /// Worker-owned copy of the scene, refreshed at each sync.
    snapshot: DrawList,
    clear: Color,
    scale: f32,
    geometry_dirty: bool,
}

/// Result of the sync sub-phase.
enum Synced {
    Ready,
    Abort(AbortReason),
}

impl<B: RenderBackend> RenderWorker<B> {
    fn new(parts: WorkerParts<B>) -> Self {
        let WorkerParts { handshake, surface, ui, ui_thread, delivery, stats } = parts;
        Self {
            targets: FrameTargetManager::new(Arc::clone(&stats)),
            handshake,
            surface,
            ui,
            ui_thread,
            delivery,
            stats,
            context: None,
            snapshot: DrawList::new(),
            clear: Color::BLACK,
            scale: 1.0,
            geometry_dirty: false,
        }
    }

    fn run(mut self, rx: Receiver<WorkerRequest>) {
        let _guard = ExitGuard { handshake: Arc::clone(&self.handshake), ui: self.ui.clone() };
        log::debug!("render worker started");

        while let Ok(req) = rx.recv() {
            match req {
                WorkerRequest::Init => self.init(),
                WorkerRequest::Render { serial } => self.render(serial),
                WorkerRequest::Resize => self.resize(),
                WorkerRequest::Stop => {
                    self.stop();
                    break;
                }
            }
        }

        log::debug!("render worker finished");
    }

    // ── Init ──────────────────────────────────────────────────────────────

    fn init(&mut self) {
        let context = self.handshake.lock().context.take();
        let Some(mut context) = context else {
            log::error!("init without a graphics context; renders will abort");
            return;
        };

        match context.make_current(&self.surface) {
            Ok(()) => context.done_current(),
            // Render retries activation on every request.
            Err(err) => log::warn!("context activation failed during init: {err}"),
        }
        log::debug!("render worker initialized ({} backend)", context.backend_name());
        self.context = Some(context);
    }

    // ── Render ────────────────────────────────────────────────────────────

    fn render(&mut self, serial: u64) {
        assert_ne!(
            thread::current().id(),
            self.ui_thread,
            "render request processed on the UI thread"
        );

        let handshake = Arc::clone(&self.handshake);
        let mut state = handshake.lock();
        handshake.set_phase(RenderPhase::Syncing);

        let synced = self.sync(&state);

        // The UI thread is blocked until this point whatever the outcome.
        state.synced_serial = serial;
        ViewStats::bump(&self.stats.syncs);
        handshake.notify();
        drop(state);

        let outcome = match synced {
            Synced::Abort(reason) => {
                log::warn!("render #{serial} aborted: {reason}");
                FrameOutcome::Aborted(reason)
            }
            Synced::Ready => self.draw(serial),
        };

        self.finish(serial, outcome);
    }

    /// Sync sub-phase, run under the handshake lock.
    fn sync(&mut self, state: &SyncState<B>) -> Synced {
        let Some(context) = self.context.as_mut() else {
            return Synced::Abort(AbortReason::NotInitialized);
        };

        if let Err(err) = context.make_current(&self.surface) {
            return Synced::Abort(AbortReason::Context(err));
        }

        let size = state.geometry.pixel_size();
        if size.is_empty() {
            return Synced::Abort(AbortReason::EmptyArea);
        }
        if self.geometry_dirty {
            log::trace!("applying geometry change at {size}");
            self.geometry_dirty = false;
        }
        if let Err(err) = self.targets.ensure(context.backend(), size) {
            return Synced::Abort(AbortReason::Target(format!("{err:#}")));
        }

        self.snapshot.copy_from(&state.staged);
        self.clear = state.clear;
        self.scale = state.geometry.device_pixel_ratio;
        Synced::Ready
    }

    /// Draw sub-phase, run without the handshake lock.
    fn draw(&mut self, serial: u64) -> FrameOutcome {
        let handshake = Arc::clone(&self.handshake);
        let quit = handshake.quit_flag();
        if *quit {
            log::debug!("render #{serial}: about to quit, draw skipped");
            return FrameOutcome::Skipped;
        }

        handshake.set_phase(RenderPhase::Drawing);

        let (Some(context), Some(target)) = (self.context.as_mut(), self.targets.current_mut()) else {
            return FrameOutcome::Failed("frame target missing after sync".to_string());
        };
        let backend = context.backend();
        let result = backend
            .draw(&mut target.inner, &mut self.snapshot, self.clear, self.scale)
            .context("draw failed")
            .and_then(|()| backend.flush().context("flush failed"));
        drop(quit);

        match result {
            Ok(()) => FrameOutcome::Presented,
            Err(err) => {
                log::error!("render #{serial} failed: {err:#}");
                FrameOutcome::Failed(format!("{err:#}"))
            }
        }
    }

    /// Hands the result to the UI thread, by value.
    fn finish(&mut self, serial: u64, outcome: FrameOutcome) {
        let (outcome, frame) = match outcome {
            FrameOutcome::Presented => match self.deliver() {
                Ok(frame) => (FrameOutcome::Presented, Some(frame)),
                Err(err) => {
                    log::error!("render #{serial}: delivery failed: {err:#}");
                    (FrameOutcome::Failed(format!("{err:#}")), None)
                }
            },
            other => (other, None),
        };

        match &outcome {
            FrameOutcome::Presented => ViewStats::bump(&self.stats.frames_delivered),
            FrameOutcome::Skipped => ViewStats::bump(&self.stats.frames_skipped),
            FrameOutcome::Aborted(_) | FrameOutcome::Failed(_) => {
                ViewStats::bump(&self.stats.frames_failed)
            }
        }
        log::trace!("render #{serial} finished: {outcome:?}");

        if let Some(context) = self.context.as_mut() {
            if context.is_current() {
                context.done_current();
            }
        }
        self.handshake.set_phase(RenderPhase::Done);
        self.ui.post(UiMessage::FrameFinished { serial, outcome, frame });
    }

    fn deliver(&mut self) -> Result<PresentedFrame<B::Shared>> {
        let Some(context) = self.context.as_mut() else {
            anyhow::bail!("no graphics context");
        };
        let Some(target) = self.targets.current() else {
            anyhow::bail!("no frame target");
        };

        match self.delivery {
            DeliveryMode::Image => {
                context.make_current(&self.surface)?;
                let image = context.backend().grab(&target.inner);
                context.done_current();
                Ok(PresentedFrame::Image(image?))
            }
            DeliveryMode::SharedTarget => {
                context.make_current(&self.surface)?;
                let shared = context.backend().share(&target.inner);
                context.done_current();
                Ok(PresentedFrame::Target { shared, size: target.size })
            }
        }
    }

    // ── Resize ────────────────────────────────────────────────────────────

    fn resize(&mut self) {
        // Recreation happens in the next sync.
        self.geometry_dirty = true;
        log::trace!("render worker: geometry marked dirty");
    }

    // ── Stop ──────────────────────────────────────────────────────────────

    fn stop(&mut self) {
        let mut state = self.handshake.lock();

        if let Some(mut context) = self.context.take() {
            if let Err(err) = context.make_current(&self.surface) {
                log::warn!("context activation failed during stop: {err}");
            }
            self.targets.release();
            self.snapshot.clear();
            if context.is_current() {
                context.done_current();
            }
            context.move_to_thread(self.ui_thread);
            state.context = Some(context);
        } else {
            self.targets.release();
        }

        self.handshake.set_phase(RenderPhase::Idle);
        state.stopped = true;
        self.handshake.notify();
        log::debug!("render worker stopped, context returned to the UI thread");
    }
}

#[cfg(test)]
mod tests {
    use tandem_engine::coords::{Geometry, Size};
    use tandem_engine::device::RasterBackend;

    use super::*;

    struct Rig {
        handshake: Arc<Handshake<RasterBackend>>,
        stats: Arc<ViewStats>,
        ui_rx: Receiver<UiMessage<<RasterBackend as RenderBackend>::Shared>>,
        worker: WorkerHandle,
    }

    type Parts = (
        WorkerParts<RasterBackend>,
        Arc<Handshake<RasterBackend>>,
        Arc<ViewStats>,
        Receiver<UiMessage<<RasterBackend as RenderBackend>::Shared>>,
    );

    /// Worker parts whose UI thread is the calling thread.
    fn parts() -> Parts {
        let backend = RasterBackend::new();
        let surface = OffscreenSurface::new(backend.format());
        let handshake = Arc::new(Handshake::new(Color::BLACK));
        handshake.lock().context = Some(GraphicsContext::new(backend));
        let stats = Arc::new(ViewStats::default());
        let (ui_tx, ui_rx) = crossbeam_channel::unbounded();
        let parts = WorkerParts {
            handshake: Arc::clone(&handshake),
            surface,
            ui: UiPost::new(ui_tx),
            ui_thread: thread::current().id(),
            delivery: DeliveryMode::Image,
            stats: Arc::clone(&stats),
        };
        (parts, handshake, stats, ui_rx)
    }

    fn rig() -> Rig {
        let (parts, handshake, stats, ui_rx) = parts();
        let worker = spawn("worker-test", parts).unwrap();
        Rig { handshake, stats, ui_rx, worker }
    }

    fn hand_over(rig: &Rig) {
        let id = rig.worker.thread_id();
        if let Some(ctx) = rig.handshake.lock().context.as_mut() {
            ctx.move_to_thread(id);
        }
    }

    fn next_outcome(rig: &Rig) -> (u64, FrameOutcome, bool) {
        match rig.ui_rx.recv().unwrap() {
            UiMessage::FrameFinished { serial, outcome, frame } => (serial, outcome, frame.is_some()),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn render_before_init_still_signals_sync() {
        let rig = rig();
        let guard = rig.handshake.lock();
        assert!(rig.worker.post(WorkerRequest::Render { serial: 1 }));
        let guard = rig.handshake.wait_synced(guard, 1);
        assert_eq!(guard.synced_serial, 1);
        drop(guard);

        let (serial, outcome, has_frame) = next_outcome(&rig);
        assert_eq!(serial, 1);
        assert_eq!(outcome, FrameOutcome::Aborted(AbortReason::NotInitialized));
        assert!(!has_frame);
        assert_eq!(rig.stats.snapshot().frames_failed, 1);
    }

    #[test]
    fn init_render_stop_round_trip() {
        let rig = rig();
        hand_over(&rig);
        rig.handshake.lock().geometry = Geometry::new(Size::new(4.0, 3.0), 2.0);

        rig.worker.post(WorkerRequest::Init);
        let guard = rig.handshake.lock();
        rig.worker.post(WorkerRequest::Render { serial: 1 });
        drop(rig.handshake.wait_synced(guard, 1));

        let (_, outcome, has_frame) = next_outcome(&rig);
        assert_eq!(outcome, FrameOutcome::Presented);
        assert!(has_frame);
        assert_eq!(rig.handshake.phase(), RenderPhase::Done);

        let guard = rig.handshake.lock();
        rig.worker.post(WorkerRequest::Stop);
        let mut guard = rig.handshake.wait_stopped(guard);
        let ctx = guard.context.take().unwrap();
        drop(guard);
        assert_eq!(ctx.owner(), thread::current().id());

        let Rig { worker, ui_rx, .. } = rig;
        worker.join();
        assert!(matches!(ui_rx.recv().unwrap(), UiMessage::WorkerExited));
    }

    #[test]
    #[should_panic(expected = "render request processed on the UI thread")]
    fn render_on_the_ui_thread_is_fatal() {
        let (parts, _handshake, _stats, _ui_rx) = parts();
        let mut worker = RenderWorker::new(parts);
        worker.render(1);
    }
}
