use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tandem_engine::coords::{Geometry, Size};
use tandem_engine::device::{GpuInit, SurfaceErrorAction, WgpuBackend, WindowGpu};
use tandem_engine::input::InputState;
use tandem_engine::input::platform::winit::{sync_window_origin, translate_window_event};
use tandem_engine::render::{BlitRenderer, BlitSource, RenderCtx, RenderTarget};
use tandem_view::{DeliveryMode, PresentedFrame, SourceLocator, ThreadedView, ViewConfig};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoopProxy};
use winit::window::{Window, WindowId};

use crate::args::Args;

const DEMO_SCENE: &str = include_str!("../scenes/demo.tsn");

/// Posted by the view's waker whenever the render worker reports back.
#[derive(Debug, Clone, Copy)]
pub enum StudioEvent {
    Wake,
}

/// Everything tied to the open window. Dropped on the UI thread.
struct Session {
    window: Arc<Window>,
    gpu: WindowGpu,
    input: InputState,
    blit: BlitRenderer,
    view: ThreadedView<WgpuBackend>,
}

impl Session {
    /// Blits the latest presented frame onto the window. Returns false on a
    /// fatal swapchain error.
    fn present(&mut self, screenshot: &mut Option<PathBuf>) -> bool {
        let logical_size = self.view.geometry().size;
        let Some(presented) = self.view.paint() else { return true };

        if let (Some(path), PresentedFrame::Image(image)) = (screenshot.as_ref(), presented) {
            match image.save_png(path) {
                Ok(()) => log::info!("saved {}x{} frame to {}", image.width(), image.height(), path.display()),
                Err(err) => log::error!("screenshot failed: {err:#}"),
            }
            *screenshot = None;
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => {
                        log::error!("swapchain out of memory; closing");
                        false
                    }
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        self.window.request_redraw();
                        true
                    }
                };
            }
        };

        {
            let ctx = RenderCtx::new(self.gpu.device(), self.gpu.queue(), self.gpu.surface_format(), logical_size);
            let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
            let source = match presented {
                PresentedFrame::Image(image) => BlitSource::Image(image),
                PresentedFrame::Target { shared, .. } => BlitSource::Texture(&shared.texture),
            };
            self.blit.render(&ctx, &mut target, source);
        }

        self.gpu.submit(frame);
        true
    }
}

/// winit application hosting one [`ThreadedView`] in one window.
pub struct Studio {
    args: Args,
    proxy: EventLoopProxy<StudioEvent>,
    gpu_init: GpuInit,
    tick: Option<Duration>,
    session: Option<Session>,
    screenshot: Option<PathBuf>,
    error: Option<anyhow::Error>,
}

impl Studio {
    pub fn new(mut args: Args, proxy: EventLoopProxy<StudioEvent>) -> Self {
        let screenshot = args.screenshot.take();
        Self {
            args,
            proxy,
            gpu_init: GpuInit::default(),
            tick: ViewConfig::default().update_interval,
            session: None,
            screenshot,
            error: None,
        }
    }

    /// Reports a startup failure recorded while the loop was running.
    pub fn finish(mut self) -> Result<()> {
        self.teardown();
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<Session> {
        let attrs = Window::default_attributes()
            .with_title("tandem studio")
            .with_inner_size(LogicalSize::new(640.0, 400.0));
        let window = Arc::new(event_loop.create_window(attrs).context("failed to create window")?);

        let gpu = pollster::block_on(WindowGpu::new(Arc::clone(&window), &self.gpu_init))?;

        let backend = match self.args.delivery {
            DeliveryMode::Image => WgpuBackend::new_blocking(&self.gpu_init)?,
            // Frame targets must live on the presenter's device to be sampled directly.
            DeliveryMode::SharedTarget => WgpuBackend::from_device(
                gpu.device().clone(),
                gpu.queue().clone(),
                self.gpu_init.target_format,
            ),
        };

        let config = ViewConfig { delivery: self.args.delivery, ..ViewConfig::default() };
        let mut view = ThreadedView::new(backend, config)?;

        let proxy = self.proxy.clone();
        view.set_waker(move || {
            let _ = proxy.send_event(StudioEvent::Wake);
        });

        let mut input = InputState::new();
        sync_window_origin(&window, &mut input);

        view.resize(geometry_of(&window));
        let source = self
            .args
            .source
            .clone()
            .unwrap_or_else(|| SourceLocator::inline(DEMO_SCENE));
        log::info!("showing {source} ({:?} delivery)", self.args.delivery);
        view.set_source(source);

        Ok(Session { window, gpu, input, blit: BlitRenderer::new(), view })
    }

    fn pump(&mut self, event_loop: &ActiveEventLoop) {
        let Some(session) = self.session.as_mut() else { return };

        session.view.process_pending();
        if !session.view.is_worker_alive() {
            log::error!("render worker exited; closing");
            self.quit(event_loop);
            return;
        }
        if session.view.take_repaint_request() {
            session.window.request_redraw();
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(session) = self.session.as_mut() else { return };
        if !session.present(&mut self.screenshot) {
            self.quit(event_loop);
        }
    }

    fn resized(&mut self) {
        let Some(session) = self.session.as_mut() else { return };
        session.gpu.resize(session.window.inner_size());
        // Coalesced with any other resize queued before the next pump.
        session.view.queue_resize(geometry_of(&session.window));
    }

    fn quit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(session) = self.session.as_mut() {
            session.view.about_to_quit();
        }
        self.teardown();
        event_loop.exit();
    }

    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.view.shutdown();
            log::debug!("session closed: {:?}", session.view.stats());
        }
    }
}

impl ApplicationHandler<StudioEvent> for Studio {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return;
        }

        match self.open(event_loop) {
            Ok(session) => {
                session.window.request_redraw();
                self.session = Some(session);
            }
            Err(err) => {
                log::error!("failed to start: {err:#}");
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: StudioEvent) {
        match event {
            StudioEvent::Wake => self.pump(event_loop),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.pump(event_loop);

        // The update tick lives inside the view; wake up to drain it.
        match (self.session.is_some(), self.tick) {
            (true, Some(tick)) => event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + tick)),
            _ => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match &event {
            WindowEvent::CloseRequested => {
                self.quit(event_loop);
                return;
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                self.resized();
                return;
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                return;
            }
            _ => {}
        }

        let Some(session) = self.session.as_mut() else { return };
        if let Some(input) = translate_window_event(&session.window, &mut session.input, &event) {
            session.view.handle_input(input);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(session) = self.session.as_mut() {
            session.view.about_to_quit();
        }
        self.teardown();
    }
}

fn geometry_of(window: &Window) -> Geometry {
    let scale = window.scale_factor();
    let size = window.inner_size().to_logical::<f32>(scale);
    Geometry::new(Size::new(size.width, size.height), scale as f32)
}
