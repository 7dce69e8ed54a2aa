//! canny - edge-mask every frame of a video

use anyhow::Result;
use clap::Parser;

use videoloop::cli::{init_logging, install_stop_flag, CommonArgs};
use videoloop::{EdgeMask, FramePump};

const DEFAULT_SOURCE: &str = "resources/traffic.mp4";

#[derive(Parser, Debug)]
#[command(
    name = "canny",
    about = "Keep only Canny edge pixels of each frame, optionally writing the result"
)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let session = args.common.resolve(DEFAULT_SOURCE, None)?;

    let stop = install_stop_flag()?;
    let source = session.open_source()?;
    let sink = session.open_output(source.as_ref())?;
    let edges = EdgeMask::new(session.config.canny.clone())?;

    let mut pump = FramePump::new(source)
        .with_transform(Box::new(edges))
        .with_stop_flag(stop);
    if let Some(sink) = sink {
        pump = pump.with_sink(sink);
    }
    session.run(pump)?;
    Ok(())
}
