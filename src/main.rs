// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "viewfinder")]
#[command(about = "Camera capture and preview subsystem")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the capture device and print its identity
    Probe {
        /// Capture device node (default: /dev/video0)
        #[arg(short, long)]
        device: Option<String>,

        /// Use the synthetic test-pattern source instead of hardware
        #[arg(long)]
        pattern: bool,
    },

    /// Take a still photo
    Photo {
        /// Capture device node (default: /dev/video0)
        #[arg(short, long)]
        device: Option<String>,

        /// Use the synthetic test-pattern source instead of hardware
        #[arg(long)]
        pattern: bool,

        /// Output file path (default: IMG_TIMESTAMP.bmp)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a headless preview stream and report frame statistics
    Preview {
        /// Capture device node (default: /dev/video0)
        #[arg(short, long)]
        device: Option<String>,

        /// Use the synthetic test-pattern source instead of hardware
        #[arg(long)]
        pattern: bool,

        /// Streaming duration in seconds
        #[arg(long, default_value = "5")]
        duration: u64,

        /// Digital zoom in percent (100-400)
        #[arg(short, long, default_value = "100")]
        zoom: u32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=viewfinder=debug, RUST_LOG=info
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
        Commands::Probe { device, pattern } => cli::probe(device, pattern),
        Commands::Photo {
            device,
            pattern,
            output,
        } => cli::take_photo(device, pattern, output),
        Commands::Preview {
            device,
            pattern,
            duration,
            zoom,
        } => cli::run_preview(device, pattern, duration, zoom),
    }
}
