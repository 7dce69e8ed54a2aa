//! capture_ui - show a live source in a window until the exit key is pressed

use anyhow::Result;
use clap::Parser;

use videoloop::cli::{init_logging, install_stop_flag, CommonArgs};
use videoloop::{open_display, FramePump};

const DEFAULT_SOURCE: &str = "0";

#[derive(Parser, Debug)]
#[command(name = "capture_ui", about = "Display frames from a camera, file or stream")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Window title
    #[arg(long, value_name = "TITLE")]
    window: Option<String>,

    /// Key code that closes the window (default Esc = 27)
    #[arg(long, value_name = "CODE")]
    exit_key: Option<i32>,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let mut session = args.common.resolve(DEFAULT_SOURCE, None)?;
    if let Some(title) = args.window {
        session.config.window_title = title;
    }
    if let Some(key) = args.exit_key {
        session.config.exit_key = key;
    }
    session.config.validate()?;
    if let Some(path) = &session.output {
        log::warn!("capture_ui only displays frames; ignoring output {}", path.display());
    }

    let stop = install_stop_flag()?;
    let source = session.open_source()?;
    let display = {
        let _stage = session.ui.stage("Open window");
        open_display(&session.config.window_title, session.config.exit_key)?
    };
    log::info!(
        "Press key {} in '{}' to exit",
        session.config.exit_key,
        session.config.window_title
    );

    let pump = FramePump::new(source)
        .with_sink(display)
        .with_stop_flag(stop);
    session.run(pump)?;
    Ok(())
}
