// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Key that cancels an interactive scan when no override is configured
pub const DEFAULT_CANCEL_KEY: char = 'q';

/// How long the confirmation frame stays on screen after a successful
/// decode, in milliseconds
///
/// Gives the user a moment to see which barcode was recognized before the
/// scan loop tears down.
pub const DEFAULT_CONFIRM_HOLD_MS: u64 = 500;

/// Interval for polling the cancel key between frames
///
/// Cancellation latency is bounded by one frame period plus this poll
/// interval, so it only needs to be short relative to frame capture.
pub const KEY_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Default vertical step between scanned rows when searching a frame
///
/// EAN-13 symbols on book covers span many rows; sampling every few rows
/// is enough to find one and keeps per-frame cost low.
pub const DEFAULT_ROW_STEP: u32 = 4;

/// Number of mmap buffers requested from the V4L2 capture stream
pub const CAPTURE_BUFFER_COUNT: u32 = 4;

/// Snapshot file naming
pub mod snapshot {
    /// Prefix for saved confirmation frames
    pub const FILE_PREFIX: &str = "SCAN";

    /// Timestamp format used in snapshot filenames
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

    /// Subdirectory under the user's pictures directory
    pub const SUBDIRECTORY: &str = "bookscan";
}
