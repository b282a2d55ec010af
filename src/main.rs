// SPDX-License-Identifier: GPL-3.0-only

use barcode_scanner::backends::camera::types::CameraBackendType;
use barcode_scanner::config::Config;
use barcode_scanner::scanner::SelectionPolicy;
use clap::{Parser, Subcommand};

mod cli;

#[derive(Parser)]
#[command(name = "barcode-scanner")]
#[command(about = "Camera barcode scanner for the terminal")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Camera backend to use (v4l2, virtual)
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available video input devices
    List,

    /// Run a one-shot scan and print the decoded text
    Scan {
        /// Device to use: an index from 'list' or a device id
        #[arg(short, long)]
        device: Option<String>,

        /// Device selection policy when none is given (auto, manual)
        #[arg(short, long)]
        policy: Option<String>,

        /// Give up after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=barcode_scanner=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let mut config = Config::load();

    if let Some(name) = &args.backend {
        config.backend = CameraBackendType::from_name(name)
            .ok_or_else(|| format!("unknown backend: {}", name))?;
    }

    match args.command {
        Some(Commands::List) => cli::list_devices(config.backend),
        Some(Commands::Scan {
            device,
            policy,
            timeout,
        }) => {
            let policy = match policy {
                Some(name) => SelectionPolicy::from_name(&name)
                    .ok_or_else(|| format!("unknown selection policy: {}", name))?,
                None => config.selection_policy,
            };
            cli::scan(config.backend, device, policy, timeout)
        }
        None => barcode_scanner::terminal::run(config),
    }
}
