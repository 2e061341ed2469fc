use std::path::PathBuf;

use clap::Parser;
use tandem_view::{DeliveryMode, SourceLocator};

/// Shows a scene rendered on a dedicated worker thread.
#[derive(Debug, Parser)]
#[command(name = "tandem-studio", version)]
pub struct Cli {
    /// Scene document: a path, a `file:` URL or `inline:` source. Defaults to
    /// the bundled demo.
    #[arg(value_name = "SCENE")]
    scene: Option<String>,

    /// Hand frames over as a shared GPU target instead of a read-back image.
    #[arg(long)]
    shared_target: bool,

    /// Save the first presented frame as PNG (image delivery only).
    #[arg(long, value_name = "PATH")]
    screenshot: Option<PathBuf>,
}

/// Resolved command line of the demo host.
#[derive(Debug, Default, PartialEq)]
pub struct Args {
    /// `None` shows the bundled demo scene.
    pub source: Option<SourceLocator>,
    pub delivery: DeliveryMode,
    pub screenshot: Option<PathBuf>,
}

impl Args {
    /// Parses the process arguments. Exits with usage on `--help` or bad input.
    pub fn parse() -> Self {
        Self::from_cli(Cli::parse())
    }

    fn from_cli(cli: Cli) -> Self {
        let delivery = if cli.shared_target { DeliveryMode::SharedTarget } else { DeliveryMode::Image };
        let mut screenshot = cli.screenshot;
        if screenshot.is_some() && delivery == DeliveryMode::SharedTarget {
            log::warn!("--screenshot needs image delivery; it is ignored with --shared-target");
            screenshot = None;
        }

        Self { source: cli.scene.as_deref().map(SourceLocator::parse), delivery, screenshot }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        let argv = std::iter::once("tandem-studio").chain(args.iter().copied());
        Cli::try_parse_from(argv).map(Args::from_cli)
    }

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_image_delivery_and_demo_scene() {
        let args = parse(&[]).unwrap();
        assert_eq!(args, Args::default());
    }

    #[test]
    fn scene_path_and_flags() {
        let args = parse(&["--shared-target", "scenes/demo.tsn"]).unwrap();
        assert_eq!(args.delivery, DeliveryMode::SharedTarget);
        assert_eq!(args.source, Some(SourceLocator::file("scenes/demo.tsn")));
    }

    #[test]
    fn screenshot_dropped_for_shared_target() {
        let args = parse(&["--screenshot", "out.png"]).unwrap();
        assert_eq!(args.screenshot, Some(PathBuf::from("out.png")));

        let args = parse(&["--shared-target", "--screenshot", "out.png"]).unwrap();
        assert!(args.screenshot.is_none());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&["--screenshot"]).is_err());
        assert!(parse(&["--fast"]).is_err());
        assert!(parse(&["a.tsn", "b.tsn"]).is_err());
    }
}
