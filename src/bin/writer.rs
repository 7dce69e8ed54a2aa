//! writer - copy a source into a video container or image sequence

use anyhow::Result;
use clap::Parser;

use videoloop::cli::{init_logging, install_stop_flag, CommonArgs};
use videoloop::FramePump;

const DEFAULT_SOURCE: &str = "resources/traffic.mp4";
const DEFAULT_OUTPUT: &str = "output/writer.avi";

#[derive(Parser, Debug)]
#[command(name = "writer", about = "Re-encode a source frame by frame")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let session = args.common.resolve(DEFAULT_SOURCE, Some(DEFAULT_OUTPUT))?;

    let stop = install_stop_flag()?;
    let source = session.open_source()?;
    let sink = session.open_output(source.as_ref())?;

    let mut pump = FramePump::new(source).with_stop_flag(stop);
    if let Some(sink) = sink {
        pump = pump.with_sink(sink);
    }
    session.run(pump)?;
    Ok(())
}
