mod app;
mod args;

use anyhow::{Context, Result};
use tandem_engine::logging::{LoggingConfig, init_logging};
use winit::event_loop::EventLoop;

use crate::app::{Studio, StudioEvent};
use crate::args::Args;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let args = Args::parse();

    let event_loop = EventLoop::<StudioEvent>::with_user_event()
        .build()
        .context("failed to create winit EventLoop")?;
    let mut studio = Studio::new(args, event_loop.create_proxy());

    event_loop
        .run_app(&mut studio)
        .context("winit event loop terminated with error")?;

    studio.finish()
}
