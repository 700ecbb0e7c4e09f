// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand, ValueEnum};
use photomaton::constants::{DEFAULT_BURST_COUNTDOWN_SECS, DEFAULT_BURST_FRAMES};
use photomaton::OutputFormat;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "photomaton")]
#[command(about = "Kiosk photobooth capture pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Output format selection on the command line
#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Landscape,
    Square,
    Tall,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Landscape => OutputFormat::Landscape,
            FormatArg::Square => OutputFormat::SquareFrame,
            FormatArg::Tall => OutputFormat::TallFrame,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Take a composited photo
    Photo {
        /// Camera index to use (from 'photomaton list')
        #[arg(short, long, default_value = "0")]
        camera: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "landscape")]
        format: FormatArg,

        /// Use the synthetic test pattern instead of a real camera
        #[arg(long)]
        pattern: bool,

        /// Output file path (default: ~/Pictures/photomaton/photo_TIMESTAMP.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also upload the capture to this backend base URL
        #[arg(long)]
        upload: Option<String>,
    },

    /// Capture an animated burst
    Burst {
        /// Camera index to use (from 'photomaton list')
        #[arg(short, long, default_value = "0")]
        camera: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "landscape")]
        format: FormatArg,

        /// Number of frames to capture
        #[arg(short = 'n', long, default_value_t = DEFAULT_BURST_FRAMES)]
        frames: usize,

        /// Countdown seconds before each frame
        #[arg(long, default_value_t = DEFAULT_BURST_COUNTDOWN_SECS)]
        countdown: u32,

        /// Use the synthetic test pattern instead of a real camera
        #[arg(long)]
        pattern: bool,

        /// Output file path (default: ~/Pictures/photomaton/burst_TIMESTAMP.gif)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also upload the capture to this backend base URL
        #[arg(long)]
        upload: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=photomaton=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cli::list_cameras(),
        Commands::Photo {
            camera,
            format,
            pattern,
            output,
            upload,
        } => cli::take_photo(camera, format.into(), pattern, output, upload),
        Commands::Burst {
            camera,
            format,
            frames,
            countdown,
            pattern,
            output,
            upload,
        } => cli::take_burst(camera, format.into(), frames, countdown, pattern, output, upload),
    }
}
