use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use tandem_engine::coords::{Geometry, PixelSize, Size, Vec2};
use tandem_engine::device::{
    ContextError, FrameImage, RasterBackend, RasterShared, RasterTarget, RenderBackend,
    SurfaceFormat,
};
use tandem_engine::draw::DrawList;
use tandem_engine::input::{Buttons, Modifiers, MouseButton, PointerEvent, PointerKind};
use tandem_engine::logging::{LoggingConfig, init_logging};
use tandem_engine::paint::Color;
use tandem_view::{
    DeliveryMode, DocumentEngine, EventResult, PresentedFrame, RenderPhase, SourceLocator,
    ThreadedView, ViewConfig,
};

const TIMEOUT: Duration = Duration::from_secs(10);

fn config() -> ViewConfig {
    init_logging(LoggingConfig { is_test: true, ..LoggingConfig::default() });
    ViewConfig { update_interval: None, ..ViewConfig::default() }
}

fn geometry(w: f32, h: f32, dpr: f32) -> Geometry {
    Geometry::new(Size::new(w, h), dpr)
}

fn pump_until<B: RenderBackend>(
    view: &mut ThreadedView<B>,
    mut done: impl FnMut(&ThreadedView<B>) -> bool,
) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if done(view) {
            return true;
        }
        view.wait_and_process(Duration::from_millis(10));
    }
    done(view)
}

fn pixel<B: RenderBackend>(view: &ThreadedView<B>, x: u32, y: u32) -> Option<[u8; 4]> {
    view.presented_frame()?.image()?.pixel(x, y)
}

/// View at `geometry` showing `src`, with its first frame presented.
fn running(src: &str, geometry: Geometry) -> ThreadedView<RasterBackend> {
    let mut view = ThreadedView::new(RasterBackend::new(), config()).unwrap();
    view.resize(geometry);
    view.set_source(SourceLocator::inline(src));
    assert!(pump_until(&mut view, |v| v.presented_frame().is_some()), "no first frame");
    view
}

fn press_at(x: f32, y: f32) -> PointerEvent {
    PointerEvent {
        kind: PointerKind::Press,
        position: Vec2::new(x, y),
        global: Vec2::new(x, y),
        button: Some(MouseButton::Left),
        buttons: Buttons::NONE.with(MouseButton::Left),
        modifiers: Modifiers::default(),
    }
}

#[test]
fn delayed_zero_size_scene_fills_the_area() {
    let engine = DocumentEngine::new().with_load_delay(Duration::from_secs(2));
    let mut view = ThreadedView::with_engine(RasterBackend::new(), Box::new(engine), config()).unwrap();
    view.resize(geometry(500.0, 300.0, 2.0));
    view.set_source(SourceLocator::inline("Scene { background: #3366ff }"));

    assert!(view.presented_frame().is_none());
    assert!(pump_until(&mut view, |v| v.presented_frame().is_some()));

    let frame = view.presented_frame().unwrap();
    assert_eq!(frame.size(), PixelSize::new(1000, 600));
    assert_eq!(view.scene().implicit_size(), Some(Size::zero()));
    assert_eq!(pixel(&view, 999, 599), Some([0x33, 0x66, 0xff, 0xff]));
    assert!(view.take_repaint_request());
    assert!(!view.take_repaint_request());
}

#[test]
fn invalid_content_reports_diagnostics_and_stays_responsive() {
    let mut view = ThreadedView::new(RasterBackend::new(), config()).unwrap();
    view.resize(geometry(200.0, 100.0, 1.0));
    view.set_source(SourceLocator::inline("Scene {\n  Rect { color: 5 }\n}"));

    assert!(pump_until(&mut view, |v| !v.diagnostics().is_empty()));
    assert_eq!(view.diagnostics()[0].location, "<inline>:2:3");

    assert_eq!(view.pointer_down(press_at(10.0, 10.0)), EventResult::Ignored);
    view.resize(geometry(300.0, 100.0, 1.0));
    view.request_update();
    view.wait_and_process(Duration::from_millis(50));

    assert!(view.presented_frame().is_none());
    assert!(!view.is_initialized());
    assert_eq!(view.stats().render_requests, 0);
}

#[test]
fn syntax_error_is_reported() {
    let mut view = ThreadedView::new(RasterBackend::new(), config()).unwrap();
    view.set_source(SourceLocator::inline("Scene { width: }"));
    assert!(pump_until(&mut view, |v| !v.diagnostics().is_empty()));
    assert!(view.presented_frame().is_none());
}

#[test]
fn runaway_nesting_is_a_diagnostic() {
    let mut view = ThreadedView::new(RasterBackend::new(), config()).unwrap();
    view.resize(geometry(20.0, 20.0, 1.0));
    let src = format!("Scene {{ {}", "Rect { ".repeat(200_000));
    view.set_source(SourceLocator::inline(src));

    assert!(pump_until(&mut view, |v| !v.diagnostics().is_empty()));
    assert!(view.diagnostics()[0].message.contains("nested deeper"));
    assert!(view.presented_frame().is_none());
}

#[test]
fn non_drawable_root_is_an_instantiation_failure() {
    let mut view = ThreadedView::new(RasterBackend::new(), config()).unwrap();
    view.resize(geometry(50.0, 50.0, 1.0));
    view.set_source(SourceLocator::inline("Object"));

    assert!(pump_until(&mut view, |v| !v.diagnostics().is_empty()));
    assert!(view.diagnostics()[0].message.contains("not a drawable item"));
    assert!(view.presented_frame().is_none());
}

#[test]
fn resize_storm_recreates_the_target_once() {
    let mut view = running("Scene { background: #00ff00 }", geometry(100.0, 100.0, 1.0));
    let before = view.stats();
    assert_eq!((before.target_creations, before.target_recreations), (1, 0));

    for i in 1..=50 {
        view.queue_resize(geometry(100.0 + i as f32, 80.0, 1.0));
    }
    view.process_pending();

    assert!(pump_until(&mut view, |v| {
        v.presented_frame().is_some_and(|f| f.size() == PixelSize::new(150, 80))
    }));
    let after = view.stats();
    assert_eq!(after.target_recreations, 1);
    assert_eq!(after.target_creations, 2);
    assert_eq!(after.resizes_coalesced, 49);
    assert_eq!(view.geometry(), geometry(150.0, 80.0, 1.0));
}

#[test]
fn direct_resize_is_synced_before_returning() {
    let mut view = running("Scene { }", geometry(10.0, 10.0, 1.0));
    view.resize(geometry(20.0, 10.0, 3.0));
    // Target recreation happens during sync, which resize waits for.
    assert_eq!(view.stats().target_recreations, 1);
    assert!(pump_until(&mut view, |v| {
        v.presented_frame().is_some_and(|f| f.size() == PixelSize::new(60, 30))
    }));
}

#[test]
fn repeated_update_requests_post_once() {
    let mut view = running("Scene { }", geometry(10.0, 10.0, 1.0));
    let before = view.stats();

    for _ in 0..10 {
        view.request_update();
    }
    assert_eq!(view.stats().updates_posted, before.updates_posted + 1);

    view.process_pending();
    assert!(pump_until(&mut view, |v| v.stats().frames_delivered == before.frames_delivered + 1));
    let after = view.stats();
    assert_eq!(after.render_requests, before.render_requests + 1);
    assert_eq!(after.syncs, after.render_requests);
}

#[test]
fn invalid_surface_aborts_but_still_syncs() {
    let mut view = running("Scene { background: #ff0000 }", geometry(8.0, 8.0, 1.0));
    let first = view.presented_frame().and_then(PresentedFrame::image).cloned().unwrap();
    let before = view.stats();

    view.offscreen_surface().invalidate();
    view.request_update();
    view.process_pending();

    assert_eq!(view.stats().syncs, before.syncs + 1);
    assert!(pump_until(&mut view, |v| v.stats().frames_failed == before.frames_failed + 1));

    let kept = view.presented_frame().and_then(PresentedFrame::image).unwrap();
    assert!(kept.ptr_eq(&first));
    assert!(view.is_worker_alive());
}

#[test]
fn about_to_quit_skips_drawing() {
    let mut view = running("Scene { }", geometry(8.0, 8.0, 1.0));
    let before = view.stats();

    view.about_to_quit();
    view.request_update();
    view.process_pending();

    assert!(pump_until(&mut view, |v| v.stats().frames_skipped == 1));
    let after = view.stats();
    assert_eq!(after.frames_delivered, before.frames_delivered);
    assert_eq!(after.syncs, before.syncs + 1);
}

#[test]
fn consumed_press_schedules_an_update() {
    let src = "Scene { Toggle { x: 0 y: 0 width: 50 height: 50 off: #ff0000 on: #00ff00 } }";
    let mut view = running(src, geometry(100.0, 100.0, 1.0));
    assert_eq!(pixel(&view, 10, 10), Some([255, 0, 0, 255]));
    let before = view.stats();

    view.set_origin(Vec2::new(20.0, 20.0));
    assert_eq!(view.pointer_down(press_at(90.0, 90.0)), EventResult::Ignored);
    assert_eq!(view.pointer_down(press_at(30.0, 30.0)), EventResult::Consumed);
    assert_eq!(view.stats().updates_posted, before.updates_posted + 1);

    assert!(pump_until(&mut view, |v| pixel(v, 10, 10) == Some([0, 255, 0, 255])));
}

#[test]
fn shared_target_delivery() {
    let config = ViewConfig { delivery: DeliveryMode::SharedTarget, ..config() };
    let mut view = ThreadedView::new(RasterBackend::new(), config).unwrap();
    view.resize(geometry(4.0, 2.0, 1.0));
    view.set_source(SourceLocator::inline("Scene { background: #0000ff }"));
    assert!(pump_until(&mut view, |v| v.presented_frame().is_some()));

    let Some(PresentedFrame::Target { shared, size }) = view.presented_frame() else {
        panic!("expected a shared target");
    };
    assert_eq!(*size, PixelSize::new(4, 2));
    assert_eq!(shared.snapshot().pixel(3, 1), Some([0, 0, 255, 255]));
}

#[test]
fn shutdown_returns_the_context_and_stops_frames() {
    let mut view = running("Scene { }", geometry(8.0, 8.0, 1.0));
    let me = thread::current().id();
    assert_ne!(view.context_owner(), Some(me));
    assert_eq!(view.render_phase(), RenderPhase::Done);

    view.shutdown();
    let delivered = view.stats().frames_delivered;
    assert_eq!(view.context_owner(), Some(me));
    assert!(!view.is_worker_alive());

    view.request_update();
    view.resize(geometry(16.0, 16.0, 1.0));
    assert_eq!(view.wait_and_process(Duration::from_millis(20)), 0);
    assert_eq!(view.stats().frames_delivered, delivered);

    view.shutdown();
}

#[test]
fn dropping_a_busy_view_joins_the_worker() {
    let mut view = ThreadedView::new(RasterBackend::new(), config()).unwrap();
    view.resize(geometry(64.0, 64.0, 1.0));
    view.set_source(SourceLocator::inline("Scene { Pulse { width: 100% height: 100% } }"));
    drop(view);
}

#[test]
fn waker_fires_when_the_worker_posts() {
    let woke = Arc::new(AtomicBool::new(false));
    let mut view = ThreadedView::new(RasterBackend::new(), config()).unwrap();
    let flag = Arc::clone(&woke);
    view.set_waker(move || flag.store(true, Ordering::SeqCst));

    view.resize(geometry(8.0, 8.0, 1.0));
    view.set_source(SourceLocator::inline("Scene { }"));
    assert!(woke.load(Ordering::SeqCst));
    assert!(pump_until(&mut view, |v| v.presented_frame().is_some()));
}

// ── Failing backend ───────────────────────────────────────────────────────

/// Raster backend whose draws fail while the switch is on.
struct Flaky {
    inner: RasterBackend,
    fail: Arc<AtomicBool>,
}

impl RenderBackend for Flaky {
    type Target = RasterTarget;
    type Shared = RasterShared;

    fn name(&self) -> &'static str {
        "flaky"
    }

    fn format(&self) -> SurfaceFormat {
        self.inner.format()
    }

    fn check_device(&self) -> Result<(), ContextError> {
        self.inner.check_device()
    }

    fn create_target(&mut self, size: PixelSize) -> Result<RasterTarget> {
        self.inner.create_target(size)
    }

    fn draw(&mut self, target: &mut RasterTarget, list: &mut DrawList, clear: Color, scale: f32) -> Result<()> {
        anyhow::ensure!(!self.fail.load(Ordering::SeqCst), "injected draw failure");
        self.inner.draw(target, list, clear, scale)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    fn grab(&mut self, target: &RasterTarget) -> Result<FrameImage> {
        self.inner.grab(target)
    }

    fn share(&self, target: &RasterTarget) -> RasterShared {
        self.inner.share(target)
    }
}

#[test]
fn failed_draw_keeps_the_last_good_frame() {
    let fail = Arc::new(AtomicBool::new(false));
    let backend = Flaky { inner: RasterBackend::new(), fail: Arc::clone(&fail) };
    let mut view = ThreadedView::new(backend, config()).unwrap();
    view.resize(geometry(6.0, 6.0, 1.0));
    view.set_source(SourceLocator::inline("Scene { background: #ffffff }"));
    assert!(pump_until(&mut view, |v| v.presented_frame().is_some()));
    let good = view.presented_frame().and_then(PresentedFrame::image).cloned().unwrap();

    fail.store(true, Ordering::SeqCst);
    view.resize(geometry(12.0, 6.0, 1.0));
    assert!(pump_until(&mut view, |v| v.stats().frames_failed == 1));

    let shown = view.presented_frame().and_then(PresentedFrame::image).unwrap();
    assert!(shown.ptr_eq(&good));
    assert_eq!(shown.size(), PixelSize::new(6, 6));

    fail.store(false, Ordering::SeqCst);
    view.request_update();
    assert!(pump_until(&mut view, |v| {
        v.presented_frame().is_some_and(|f| f.size() == PixelSize::new(12, 6))
    }));
    let stats = view.stats();
    assert_eq!(stats.syncs, stats.render_requests);
}

// ── Slow backend ──────────────────────────────────────────────────────────

/// Raster backend whose draws park until released while `hold` is set.
struct Gated {
    inner: RasterBackend,
    hold: Arc<AtomicBool>,
    entered: crossbeam_channel::Sender<()>,
    release: crossbeam_channel::Receiver<()>,
}

impl RenderBackend for Gated {
    type Target = RasterTarget;
    type Shared = RasterShared;

    fn name(&self) -> &'static str {
        "gated"
    }

    fn format(&self) -> SurfaceFormat {
        self.inner.format()
    }

    fn check_device(&self) -> Result<(), ContextError> {
        self.inner.check_device()
    }

    fn create_target(&mut self, size: PixelSize) -> Result<RasterTarget> {
        self.inner.create_target(size)
    }

    fn draw(&mut self, target: &mut RasterTarget, list: &mut DrawList, clear: Color, scale: f32) -> Result<()> {
        if self.hold.load(Ordering::SeqCst) {
            let _ = self.entered.send(());
            let _ = self.release.recv_timeout(TIMEOUT);
        }
        self.inner.draw(target, list, clear, scale)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    fn grab(&mut self, target: &RasterTarget) -> Result<FrameImage> {
        self.inner.grab(target)
    }

    fn share(&self, target: &RasterTarget) -> RasterShared {
        self.inner.share(target)
    }
}

#[test]
fn resize_does_not_wait_for_a_frame_still_drawing() {
    let hold = Arc::new(AtomicBool::new(false));
    let (entered_tx, entered) = crossbeam_channel::unbounded();
    let (release, release_rx) = crossbeam_channel::unbounded();
    let backend = Gated {
        inner: RasterBackend::new(),
        hold: Arc::clone(&hold),
        entered: entered_tx,
        release: release_rx,
    };

    let mut view = ThreadedView::new(backend, config()).unwrap();
    view.resize(geometry(4.0, 4.0, 1.0));
    view.set_source(SourceLocator::inline("Scene { background: #ff00ff }"));
    assert!(pump_until(&mut view, |v| v.presented_frame().is_some()));
    let before = view.stats();

    hold.store(true, Ordering::SeqCst);
    view.request_update();
    view.process_pending();
    entered.recv_timeout(TIMEOUT).expect("draw never started");
    assert_eq!(view.render_phase(), RenderPhase::Drawing);

    let started = Instant::now();
    view.resize(geometry(9.0, 8.0, 1.0));
    view.resize(geometry(9.0, 8.0, 1.0));
    assert!(started.elapsed() < Duration::from_secs(1), "resize blocked on the draw");

    let mid = view.stats();
    assert_eq!(mid.render_requests, before.render_requests + 1);
    assert_eq!(mid.renders_deferred, before.renders_deferred + 1);
    assert_eq!(view.geometry(), geometry(9.0, 8.0, 1.0));

    hold.store(false, Ordering::SeqCst);
    release.send(()).unwrap();
    assert!(pump_until(&mut view, |v| {
        v.presented_frame().is_some_and(|f| f.size() == PixelSize::new(9, 8))
    }));
    let after = view.stats();
    assert_eq!(after.render_requests, before.render_requests + 2);
    assert_eq!(after.syncs, after.render_requests);
}

// ── Animation ─────────────────────────────────────────────────────────────

#[test]
fn animated_scene_keeps_rendering_without_a_tick() {
    let src = "Scene { Pulse { width: 100% height: 100% period: 1 } }";
    let mut view = running(src, geometry(8.0, 8.0, 1.0));
    let first = view.stats().frames_presented;
    assert!(pump_until(&mut view, |v| v.stats().frames_presented >= first + 3));
}

#[test]
fn static_scene_stays_idle_without_a_tick() {
    let mut view = running("Scene { Rect { width: 50% height: 50% } }", geometry(8.0, 8.0, 1.0));
    let before = view.stats();
    for _ in 0..5 {
        view.wait_and_process(Duration::from_millis(10));
    }
    assert_eq!(view.stats().render_requests, before.render_requests);
}
