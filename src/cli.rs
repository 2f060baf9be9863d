// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Running a live scan in the terminal
//! - Listing available cameras
//! - Decoding barcodes from still image files

use bookscan::backends::camera::enumerate_devices;
use bookscan::config::Config;
use bookscan::scan::decode::{Orientation, decode_frame};
use bookscan::scan::session::{ScanOutcome, SessionOptions};
use bookscan::terminal;
use std::path::PathBuf;
use std::time::Duration;

/// Run a live scan and print the decoded payload to stdout
///
/// On success the payload is the only thing written to stdout so the
/// output can be captured by scripts. Cancellation and device failures
/// are reported with the same neutral message and a nonzero exit status.
pub fn scan(
    config: &Config,
    timeout_secs: Option<u64>,
    save_frame: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = SessionOptions {
        row_step: config.row_step,
        deadline: timeout_secs.map(Duration::from_secs),
    };

    match terminal::run(config, &options, save_frame || config.save_frames)? {
        ScanOutcome::Found(payload) => {
            println!("{}", payload);
            Ok(())
        }
        ScanOutcome::Cancelled | ScanOutcome::DeviceError => {
            eprintln!("Scan cancelled or failed.");
            std::process::exit(1);
        }
    }
}

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let devices = enumerate_devices();

    if devices.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for device in &devices {
        println!("  [{}] {} ({})", device.index, device.card, device.path);
        if !device.driver.is_empty() {
            println!("      Driver: {}", device.driver);
        }
        println!();
    }

    Ok(())
}

/// Decode barcodes from still image files
///
/// Runs the same multi-orientation decode the live scan uses. Each file
/// gets one line of output; the exit status is nonzero if no file
/// yielded a payload.
pub fn decode_images(
    files: Vec<PathBuf>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    if files.is_empty() {
        return Err("no input files".into());
    }

    let mut any_found = false;
    for path in &files {
        // A file that cannot be read gets its line and the batch goes on
        let gray = match image::open(path) {
            Ok(image) => image.to_luma8(),
            Err(e) => {
                println!("{}: failed to load: {}", path.display(), e);
                continue;
            }
        };

        match decode_frame(&gray, config.row_step) {
            Some(detection) => {
                let note = match detection.orientation {
                    Orientation::Upright => "",
                    Orientation::Clockwise | Orientation::CounterClockwise => " (rotated)",
                };
                println!("{}: {}{}", path.display(), detection.payload, note);
                any_found = true;
            }
            None => {
                println!("{}: no EAN-13 symbol found", path.display());
            }
        }
    }

    if !any_found {
        std::process::exit(1);
    }
    Ok(())
}
