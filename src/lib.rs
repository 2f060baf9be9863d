// SPDX-License-Identifier: GPL-3.0-only

//! bookscan - a terminal ISBN barcode scanner
//!
//! This library provides the core functionality for the bookscan tool:
//! camera frame acquisition, multi-orientation EAN-13 decoding, and the
//! interactive scan loop that returns a book's ISBN payload.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Frame source abstraction (V4L2 cameras, image files)
//! - [`scan`]: EAN-13 decoding and the acquisition loop
//! - [`terminal`]: Terminal UI for the live scan (preview + cancel key)
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! // Interactive scanning is typically run via the binary:
//! // bookscan scan
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod scan;
pub mod terminal;

// Re-export commonly used types
pub use backends::camera::types::{BackendError, BackendResult, CameraFrame, FrameSource};
pub use config::Config;
pub use scan::decode::{Detection, Orientation, Region, decode_frame};
pub use scan::session::{ScanOutcome, ScanUi, SessionOptions};
