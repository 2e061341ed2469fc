use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{Receiver, select};
use tandem_engine::coords::{Geometry, Vec2};
use tandem_engine::device::{GraphicsContext, OffscreenSurface, RenderBackend};
use tandem_engine::draw::DrawList;
use tandem_engine::input::{HostInput, PointerEvent, PointerKind, WheelEvent};

use crate::config::ViewConfig;
use crate::frame::{FrameOutcome, PresentedFrame};
use crate::handshake::{Handshake, RenderPhase};
use crate::message::{UiMessage, UiPost, WorkerRequest};
use crate::scene::{
    Diagnostic, DocumentEngine, EventResult, LoadNotifier, LoadState, SceneEngine, SceneEvent,
    SceneHost, SourceLocator,
};
use crate::stats::{StatsSnapshot, ViewStats};
use crate::worker::{self, WorkerHandle, WorkerParts};

/// Presents a scene rendered on a dedicated worker thread.
///
/// Lives on the UI thread (it is `!Send`). The host feeds it geometry, input
/// and a scene source, drives it from its event loop through
/// [`process_pending`](Self::process_pending) or
/// [`wait_and_process`](Self::wait_and_process), and paints
/// [`presented_frame`](Self::presented_frame) when
/// [`take_repaint_request`](Self::take_repaint_request) says so.
///
/// ```rust,no_run
/// use std::time::Duration;
/// use tandem_engine::coords::{Geometry, Size};
/// use tandem_engine::device::RasterBackend;
/// use tandem_view::{ThreadedView, ViewConfig};
///
/// let mut view = ThreadedView::new(RasterBackend::new(), ViewConfig::default())?;
/// view.resize(Geometry::new(Size::new(500.0, 300.0), 2.0));
/// view.set_source("scenes/demo.tsn");
/// loop {
///     view.wait_and_process(Duration::from_millis(16));
///     if view.take_repaint_request() {
///         if let Some(frame) = view.presented_frame() {
///             println!("frame {}", frame.size());
///         }
///     }
/// }
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct ThreadedView<B: RenderBackend> {
    config: ViewConfig,
    ui_thread: ThreadId,

    handshake: Arc<Handshake<B>>,
    surface: OffscreenSurface,
    stats: Arc<ViewStats>,
    worker: Option<WorkerHandle>,
    worker_alive: bool,
    /// Context handed back by the worker at shutdown.
    context: Option<GraphicsContext<B>>,

    ui: UiPost<B::Shared>,
    ui_rx: Receiver<UiMessage<B::Shared>>,
    /// Messages drained from the mailbox but not handled yet.
    backlog: VecDeque<UiMessage<B::Shared>>,
    ticker: Option<Receiver<Instant>>,

    host: SceneHost,
    polished: DrawList,
    geometry: Geometry,
    origin: Vec2,

    /// Serial of the last `Render` posted.
    serial: u64,
    /// Serial of the last `Render` whose result arrived.
    last_finished: u64,
    update_pending: bool,
    /// A render was asked for while a frame was in flight; it runs when
    /// that frame finishes.
    render_deferred: bool,

    presented: Option<PresentedFrame<B::Shared>>,
    repaint_requested: bool,
    shut_down: bool,
}

impl<B: RenderBackend> ThreadedView<B> {
    /// Creates a view loading `.tsn` documents with [`DocumentEngine`].
    pub fn new(backend: B, config: ViewConfig) -> Result<Self> {
        Self::with_engine(backend, Box::new(DocumentEngine::new()), config)
    }

    /// Creates the offscreen surface and graphics context on the calling
    /// thread, starts the render worker and hands it the context.
    pub fn with_engine(backend: B, engine: Box<dyn SceneEngine>, config: ViewConfig) -> Result<Self> {
        let ui_thread = thread::current().id();
        let surface = OffscreenSurface::new(backend.format());
        let mut context = GraphicsContext::new(backend);

        let handshake = Arc::new(Handshake::new(config.clear_color));
        let stats = Arc::new(ViewStats::default());
        let (ui_tx, ui_rx) = crossbeam_channel::unbounded();
        let ui = UiPost::new(ui_tx);

        let worker = worker::spawn(
            &config.worker_name,
            WorkerParts {
                handshake: Arc::clone(&handshake),
                surface: surface.clone(),
                ui: ui.clone(),
                ui_thread,
                delivery: config.delivery,
                stats: Arc::clone(&stats),
            },
        )?;

        context.move_to_thread(worker.thread_id());
        handshake.lock().context = Some(context);
        worker.post(WorkerRequest::Init);
        log::debug!("threaded view started, worker {:?}", worker.thread_id());

        Ok(Self {
            config,
            ui_thread,
            handshake,
            surface,
            stats,
            worker: Some(worker),
            worker_alive: true,
            context: None,
            ui,
            ui_rx,
            backlog: VecDeque::new(),
            ticker: None,
            host: SceneHost::new(engine),
            polished: DrawList::new(),
            geometry: Geometry::default(),
            origin: Vec2::zero(),
            serial: 0,
            last_finished: 0,
            update_pending: false,
            render_deferred: false,
            presented: None,
            repaint_requested: false,
            shut_down: false,
        })
    }

    // ── Source ────────────────────────────────────────────────────────────

    /// Starts loading `source`. The scene is instantiated once the document
    /// is loaded and the presentation area is non-empty; the periodic update
    /// tick starts here.
    pub fn set_source(&mut self, source: impl Into<SourceLocator>) {
        self.assert_ui_thread("set_source");
        if self.shut_down {
            return;
        }

        let ui = self.ui.clone();
        let notify = LoadNotifier::new(move || {
            ui.post(UiMessage::SceneStatus);
        });
        self.presented = None;
        self.host.load(source.into(), notify);

        if let Some(interval) = self.config.update_interval {
            self.ticker = Some(crossbeam_channel::tick(interval));
        }
        self.ui.post(UiMessage::ResolveTarget);
    }

    /// Instantiates the scene when possible. True when a root exists.
    fn ensure_scene(&mut self) -> bool {
        if self.host.is_ready() {
            return true;
        }
        let failed_load = matches!(self.host.status(), LoadState::Error(_));
        if !self.geometry.is_presentable() && !failed_load {
            return false;
        }
        self.host.instantiate()
    }

    fn on_scene_status(&mut self) {
        let was_ready = self.host.is_ready();
        if self.ensure_scene() && !was_ready {
            log::debug!("scene ready, rendering first frame");
            self.polish_and_render();
        }
    }

    // ── Updates and rendering ─────────────────────────────────────────────

    /// Schedules one deferred render. Requests made while one is pending
    /// collapse into it.
    pub fn request_update(&mut self) {
        if !self.is_initialized() || self.update_pending {
            return;
        }
        self.update_pending = true;
        ViewStats::bump(&self.stats.updates_posted);
        self.ui.post(UiMessage::Update);
    }

    /// Polishes the scene and runs one render through its sync sub-phase.
    ///
    /// Returns once the worker has copied the scene; drawing continues on
    /// the worker. While an earlier frame is still drawing nothing is
    /// posted: the render is deferred until that frame's result is handled
    /// by [`process_pending`](Self::process_pending), so the UI thread only
    /// ever blocks on the sync sub-phase.
    ///
    /// # Panics
    /// When called off the UI thread.
    pub fn polish_and_render(&mut self) {
        self.assert_ui_thread("polish_and_render");
        if !self.worker_alive || !self.host.is_ready() {
            return;
        }
        if !self.geometry.is_presentable() {
            log::trace!("nothing to present at {:?}", self.geometry.size);
            return;
        }

        if self.frame_in_flight() {
            if !self.render_deferred {
                log::trace!("frame #{} still drawing, render deferred", self.serial);
                ViewStats::bump(&self.stats.renders_deferred);
            }
            self.render_deferred = true;
            return;
        }
        self.render_deferred = false;

        self.host.polish(&mut self.polished);

        let Some(worker) = self.worker.as_ref() else { return };
        let handshake = Arc::clone(&self.handshake);
        let mut state = handshake.lock();
        state.staged.copy_from(&self.polished);
        state.geometry = self.geometry;

        let serial = self.serial + 1;
        if !worker.post(WorkerRequest::Render { serial }) {
            log::error!("render worker is gone");
            self.worker_alive = false;
            return;
        }
        self.serial = serial;
        ViewStats::bump(&self.stats.render_requests);

        let state = handshake.wait_synced(state, serial);
        if state.stopped && state.synced_serial < serial {
            log::warn!("render #{serial}: worker stopped before syncing");
        }
        drop(state);
        log::trace!("render #{serial} synced");

        // Animated scenes keep asking for frames without input or ticks.
        if self.host.needs_update() {
            self.request_update();
        }
    }

    #[inline]
    fn frame_in_flight(&self) -> bool {
        self.worker_alive && self.last_finished < self.serial
    }

    fn on_frame_event(&mut self, msg: UiMessage<B::Shared>) {
        match msg {
            UiMessage::FrameFinished { serial, outcome, frame } => {
                self.last_finished = self.last_finished.max(serial);
                match (outcome, frame) {
                    (FrameOutcome::Presented, Some(frame)) => {
                        log::trace!("frame #{serial} presented at {}", frame.size());
                        self.presented = Some(frame);
                        ViewStats::bump(&self.stats.frames_presented);
                        self.repaint_requested = true;
                    }
                    (FrameOutcome::Skipped, _) => log::debug!("frame #{serial} skipped"),
                    // Earlier frame stays on screen.
                    (outcome, _) => log::debug!("frame #{serial} not presented: {outcome:?}"),
                }
                if self.render_deferred && !self.frame_in_flight() {
                    self.polish_and_render();
                }
            }
            UiMessage::WorkerExited => {
                if self.worker_alive && !self.shut_down {
                    log::error!("render worker exited unexpectedly");
                }
                self.worker_alive = false;
                self.last_finished = self.serial;
                self.render_deferred = false;
            }
            other => self.backlog.push_back(other),
        }
    }

    // ── Geometry ──────────────────────────────────────────────────────────

    /// Applies a new presentation area and renders once before returning,
    /// so the visible frame is never stale after a resize.
    pub fn resize(&mut self, geometry: Geometry) {
        self.assert_ui_thread("resize");
        if self.shut_down {
            return;
        }
        if geometry != self.geometry {
            log::debug!("resize to {:?} @{}", geometry.size, geometry.device_pixel_ratio);
            self.geometry = geometry;
            self.host.set_size(geometry.size);
            if let Some(worker) = self.worker.as_ref() {
                worker.post(WorkerRequest::Resize);
            }
        }
        if self.ensure_scene() {
            self.polish_and_render();
        }
    }

    /// Posts a resize to be applied by the next `process_pending`. Queued
    /// resizes collapse into the most recent one.
    pub fn queue_resize(&self, geometry: Geometry) {
        self.ui.post(UiMessage::Resize(geometry));
    }

    /// Offset of the view inside the host window, subtracted from input positions.
    pub fn set_origin(&mut self, origin: Vec2) {
        self.origin = origin;
    }

    // ── Input ─────────────────────────────────────────────────────────────

    pub fn pointer_down(&mut self, ev: PointerEvent) -> EventResult {
        self.forward(SceneEvent::Pointer(PointerEvent { kind: PointerKind::Press, ..ev }))
    }

    pub fn pointer_up(&mut self, ev: PointerEvent) -> EventResult {
        self.forward(SceneEvent::Pointer(PointerEvent { kind: PointerKind::Release, ..ev }))
    }

    pub fn pointer_move(&mut self, ev: PointerEvent) -> EventResult {
        self.forward(SceneEvent::Pointer(PointerEvent { kind: PointerKind::Move, ..ev }))
    }

    pub fn wheel(&mut self, ev: WheelEvent) -> EventResult {
        self.forward(SceneEvent::Wheel(ev))
    }

    /// Routes translated host input to the matching handler.
    pub fn handle_input(&mut self, input: HostInput) -> EventResult {
        match input {
            HostInput::Pointer(ev) => self.forward(SceneEvent::Pointer(ev)),
            HostInput::Wheel(ev) => self.forward(SceneEvent::Wheel(ev)),
        }
    }

    fn forward(&mut self, event: SceneEvent) -> EventResult {
        self.assert_ui_thread("input");
        let event = match event {
            SceneEvent::Pointer(ev) => SceneEvent::Pointer(ev.remapped(self.origin)),
            SceneEvent::Wheel(ev) => SceneEvent::Wheel(ev.remapped(self.origin)),
        };
        let result = self.host.deliver(&event);
        if result.is_consumed() {
            self.request_update();
        }
        result
    }

    // ── Event loop integration ────────────────────────────────────────────

    /// Handles everything queued so far without blocking. Returns the number
    /// of messages handled.
    pub fn process_pending(&mut self) -> usize {
        self.assert_ui_thread("process_pending");
        if self.shut_down {
            self.backlog.clear();
            while self.ui_rx.try_recv().is_ok() {}
            return 0;
        }

        if let Some(ticker) = self.ticker.as_ref() {
            if ticker.try_iter().count() > 0 {
                self.request_update();
            }
        }

        self.backlog.extend(self.ui_rx.try_iter());
        self.coalesce_resizes();

        // Messages deferred while handling this batch wait for the next call.
        let batch = self.backlog.len();
        let mut handled = 0;
        while handled < batch {
            let Some(msg) = self.backlog.pop_front() else { break };
            self.handle(msg);
            handled += 1;
        }
        handled
    }

    /// Blocks up to `timeout` for a message or an update tick, then handles
    /// what is pending.
    pub fn wait_and_process(&mut self, timeout: Duration) -> usize {
        self.assert_ui_thread("wait_and_process");
        if self.backlog.is_empty() && !self.shut_down {
            let rx = self.ui_rx.clone();
            match self.ticker.clone() {
                Some(ticker) => select! {
                    recv(rx) -> msg => {
                        if let Ok(msg) = msg {
                            self.backlog.push_back(msg);
                        }
                    }
                    recv(ticker) -> _ => self.request_update(),
                    default(timeout) => {}
                },
                None => {
                    if let Ok(msg) = rx.recv_timeout(timeout) {
                        self.backlog.push_back(msg);
                    }
                }
            }
        }
        self.process_pending()
    }

    /// Wakes a foreign event loop whenever a message is posted to the view.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.ui.set_waker(Some(Arc::new(waker)));
    }

    pub fn clear_waker(&self) {
        self.ui.set_waker(None);
    }

    fn coalesce_resizes(&mut self) {
        let is_resize = |m: &UiMessage<B::Shared>| matches!(m, UiMessage::Resize(_));
        let Some(last) = self.backlog.iter().rposition(is_resize) else { return };

        let mut index = 0;
        let mut dropped = 0;
        self.backlog.retain(|m| {
            let keep = index >= last || !is_resize(m);
            index += 1;
            if !keep {
                dropped += 1;
            }
            keep
        });
        if dropped > 0 {
            log::trace!("coalesced {dropped} queued resizes");
            ViewStats::add(&self.stats.resizes_coalesced, dropped);
        }
    }

    fn handle(&mut self, msg: UiMessage<B::Shared>) {
        match msg {
            UiMessage::Update => {
                self.update_pending = false;
                self.polish_and_render();
            }
            UiMessage::Resize(geometry) => self.resize(geometry),
            UiMessage::ResolveTarget | UiMessage::SceneStatus => self.on_scene_status(),
            msg @ (UiMessage::FrameFinished { .. } | UiMessage::WorkerExited) => self.on_frame_event(msg),
        }
    }

    // ── Painting ──────────────────────────────────────────────────────────

    /// The frame to draw in the host's repaint handler. Clears the pending
    /// repaint request.
    pub fn paint(&mut self) -> Option<&PresentedFrame<B::Shared>> {
        self.repaint_requested = false;
        self.presented.as_ref()
    }

    #[inline]
    pub fn presented_frame(&self) -> Option<&PresentedFrame<B::Shared>> {
        self.presented.as_ref()
    }

    /// True once per newly presented frame.
    pub fn take_repaint_request(&mut self) -> bool {
        std::mem::take(&mut self.repaint_requested)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Suppresses the draw sub-phase of every later render. Waits for a draw
    /// already underway.
    pub fn about_to_quit(&mut self) {
        log::debug!("about to quit");
        self.ticker = None;
        self.handshake.set_about_to_quit();
    }

    /// Stops and joins the worker and takes the graphics context back.
    /// Idempotent; also run on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.ticker = None;

        if let Some(worker) = self.worker.take() {
            let handshake = Arc::clone(&self.handshake);
            let guard = handshake.lock();
            if worker.post(WorkerRequest::Stop) {
                drop(handshake.wait_stopped(guard));
            } else {
                drop(guard);
            }
            worker.join();
        }
        self.worker_alive = false;

        self.backlog.clear();
        let dropped = self.ui_rx.try_iter().filter(UiMessage::is_frame_event).count();
        log::trace!("{dropped} frame events discarded at shutdown");

        self.context = self.handshake.lock().context.take();
        match &self.context {
            Some(ctx) => log::debug!("threaded view shut down, context back on {:?}", ctx.owner()),
            None => log::warn!("threaded view shut down without recovering the graphics context"),
        }
    }

    // ── Introspection ─────────────────────────────────────────────────────

    /// Scene load or instantiation problems for the current source.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.host.diagnostics()
    }

    pub fn load_status(&self) -> LoadState {
        self.host.status()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Lock-free view of the worker's progress.
    pub fn render_phase(&self) -> RenderPhase {
        self.handshake.phase()
    }

    pub fn offscreen_surface(&self) -> &OffscreenSurface {
        &self.surface
    }

    #[inline]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// True once the scene is instantiated and the worker is running.
    pub fn is_initialized(&self) -> bool {
        self.worker_alive && self.host.is_ready()
    }

    pub fn is_worker_alive(&self) -> bool {
        self.worker_alive
    }

    pub fn scene(&self) -> &SceneHost {
        &self.host
    }

    /// Thread the graphics context currently belongs to.
    pub fn context_owner(&self) -> Option<ThreadId> {
        if let Some(ctx) = self.context.as_ref() {
            return Some(ctx.owner());
        }
        if let Some(ctx) = self.handshake.lock().context.as_ref() {
            return Some(ctx.owner());
        }
        self.worker
            .as_ref()
            .filter(|_| self.worker_alive)
            .map(WorkerHandle::thread_id)
    }

    fn assert_ui_thread(&self, op: &str) {
        let caller = thread::current().id();
        assert_eq!(
            caller, self.ui_thread,
            "ThreadedView::{op} called on {caller:?}, the view belongs to {:?}",
            self.ui_thread
        );
    }
}

impl<B: RenderBackend> Drop for ThreadedView<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
