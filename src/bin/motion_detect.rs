//! motion_detect - flag frames that differ from a running background

use anyhow::Result;
use clap::Parser;

use videoloop::cli::{init_logging, install_stop_flag, CommonArgs};
use videoloop::{DetectionCapability, FramePump};

const DEFAULT_SOURCE: &str = "resources/traffic.mp4";
const DEFAULT_OUTPUT: &str = "output/motion-detect.avi";
const PREFERRED_BACKEND: &str = "motion";

#[derive(Parser, Debug)]
#[command(
    name = "motion_detect",
    about = "Detect moving regions and count frames containing motion"
)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Detector backend (motion, or stub for dry runs); defaults to motion
    #[arg(long, value_name = "NAME")]
    backend: Option<String>,

    /// Do not draw motion rectangles on the output
    #[arg(long)]
    no_annotate: bool,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let session = args
        .common
        .resolve(DEFAULT_SOURCE, Some(DEFAULT_OUTPUT))?;

    let stop = install_stop_flag()?;
    let detector = session.detector(
        args.backend.as_deref(),
        PREFERRED_BACKEND,
        DetectionCapability::Motion,
        !args.no_annotate,
    )?;
    let source = session.open_source()?;
    let sink = session.open_output(source.as_ref())?;

    let mut pump = FramePump::new(source)
        .with_transform(Box::new(detector))
        .with_stop_flag(stop);
    if let Some(sink) = sink {
        pump = pump.with_sink(sink);
    }
    session.run(pump)?;
    Ok(())
}
