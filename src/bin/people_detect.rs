//! people_detect - find pedestrians in each frame and write an annotated copy

use anyhow::Result;
use clap::Parser;

use videoloop::cli::{init_logging, install_stop_flag, CommonArgs};
use videoloop::{DetectionCapability, FramePump};

const DEFAULT_SOURCE: &str = "resources/walking.avi";
const DEFAULT_OUTPUT: &str = "output/people-detect.avi";
const PREFERRED_BACKEND: &str = "hog";

#[derive(Parser, Debug)]
#[command(
    name = "people_detect",
    about = "Detect people with a HOG descriptor and count frames containing them"
)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Detector backend (hog, or stub for dry runs); without it hog is used
    /// when built in, else any backend that detects people
    #[arg(long, value_name = "NAME")]
    backend: Option<String>,

    /// Do not draw detection rectangles on the output
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
        DetectionCapability::Pedestrian,
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
