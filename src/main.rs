//! showpic CLI - display images on a terminal

use clap::Parser;
use showpic::duration::parse_duration;
use showpic::terminal::Session;
use showpic::{Config, Loader, ShowpicError, ViewOptions, Viewer};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = "\
Supported formats include gif, bmp, tiff, webp, png, and jpg.

Keys:
  arrows      pan
  + z -       zoom in / out
  0           reset zoom
  Ctrl-L      redraw the screen
  Esc Enter   next image
  q           quit

Examples:
  showpic *.png
  COLORTERM=truecolor showpic *.tiff
  showpic http://webnull.ancientlore.io/media/null.png";

#[derive(Parser)]
#[command(name = "showpic", about = "Display images on a terminal", after_help = AFTER_HELP)]
struct Args {
    /// Image files or http(s) URLs
    #[arg(required = true)]
    sources: Vec<String>,
    /// Show images in grayscale
    #[arg(long)]
    grayscale: bool,
    /// Advance to the next image after this long (e.g. 5s, 1m30s); 0 disables
    #[arg(long, value_parser = parse_duration, default_value = "0")]
    slideshow: Duration,
    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write logs to this file (filter with SHOWPIC_LOG)
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(args: &Args) -> Result<(), ShowpicError> {
    // The terminal belongs to the viewer, so logs only go to a file.
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let file = std::fs::File::create(path)?;
    let filter = EnvFilter::try_from_env("SHOWPIC_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if args.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run(args: &Args) -> Result<(), ShowpicError> {
    init_logging(args)?;

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let loader = Loader::new(config.http_timeout()).with_grayscale(args.grayscale);
    let options = ViewOptions {
        debounce: config.debounce(),
        redraw_queue: config.redraw_queue,
        slideshow: (!args.slideshow.is_zero()).then_some(args.slideshow),
    };

    let mut session = Session::open(config.color_depth)?;
    let poster = session.poster();
    let visited = Viewer::new(&mut session.surface, &session.events, poster, loader, options)
        .run(&args.sources)?;
    tracing::info!(visited, total = args.sources.len(), "done");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "showpic failed");
            eprintln!("showpic: {e}");
            ExitCode::FAILURE
        }
    }
}
