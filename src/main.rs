// SPDX-License-Identifier: GPL-3.0-only

use bookscan::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "bookscan")]
#[command(about = "Terminal ISBN barcode scanner for book cataloging")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a barcode with the camera and print the ISBN payload
    Scan {
        /// Camera index to use (from 'bookscan list')
        #[arg(short, long)]
        device: Option<usize>,

        /// Key that cancels the scan
        #[arg(long)]
        cancel_key: Option<char>,

        /// Give up after this many seconds (default: scan until cancelled)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Save the confirmation frame as a PNG snapshot
        #[arg(long)]
        save_frame: bool,

        /// Persist the device and cancel-key overrides to the config file
        #[arg(long)]
        remember: bool,
    },

    /// List available cameras
    List,

    /// Decode barcodes from still image files
    Decode {
        /// Image files to decode
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=bookscan=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let config = Config::load();

    match Cli::parse().command {
        Some(Commands::Scan {
            device,
            cancel_key,
            timeout,
            save_frame,
            remember,
        }) => {
            let mut config = config;
            if let Some(index) = device {
                config.device_index = index;
            }
            if let Some(key) = cancel_key {
                config.cancel_key = key;
            }
            if remember {
                if let Err(e) = config.save() {
                    tracing::warn!(error = %e, "Could not persist configuration");
                }
            }
            cli::scan(&config, timeout, save_frame)
        }
        Some(Commands::List) => cli::list_cameras(),
        Some(Commands::Decode { files }) => cli::decode_images(files, &config),
        None => cli::scan(&config, None, false),
    }
}
