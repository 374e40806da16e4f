use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use lottie_player::{render_frames, FrameSelection, RenderOptions};
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the Lottie JSON document
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory receiving frame_NNNN.png files
    #[arg(value_name = "OUT_DIR", default_value = "frames")]
    out_dir: PathBuf,

    #[arg(long, default_value_t = 512)]
    width: i32,

    #[arg(long, default_value_t = 512)]
    height: i32,

    /// Comma-separated timestamps in milliseconds
    #[arg(long, value_delimiter = ',', conflicts_with = "frames")]
    times: Vec<f64>,

    /// Number of evenly spaced frames over the animation's duration
    #[arg(long, default_value_t = 1)]
    frames: usize,

    /// Outline repainted regions
    #[arg(long)]
    show_inval: bool,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogFormat {
    Text,
    Json,
}

fn init_logging(level: LogLevel, format: LogFormat) {
    // RUST_LOG takes precedence over the flag.
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(level).into())
        .from_env_lossy();

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.width <= 0 || cli.height <= 0 {
        bail!("Invalid output size {}x{}", cli.width, cli.height);
    }

    let frames = if cli.times.is_empty() {
        FrameSelection::Count(cli.frames)
    } else {
        FrameSelection::Times(cli.times)
    };
    let options = RenderOptions {
        width: cli.width,
        height: cli.height,
        show_inval: cli.show_inval,
        ..Default::default()
    };

    info!(input = %cli.input.display(), out_dir = %cli.out_dir.display(), "Rendering");
    render_frames(&cli.input, &cli.out_dir, &frames, &options)?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_format);

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
