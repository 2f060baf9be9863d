// SPDX-License-Identifier: GPL-3.0-only

//! Interactive acquisition loop
//!
//! Consumes frames from a [`FrameSource`], runs the multi-orientation
//! decode on each, and terminates on the first payload, on cancellation,
//! or on a device error. The loop is single-threaded and blocking: each
//! frame read blocks until the device delivers, and the cancel key is
//! polled once per iteration, so cancellation latency is bounded by one
//! frame period.

use crate::backends::camera::types::{CameraFrame, FrameSource};
use crate::constants::DEFAULT_ROW_STEP;
use crate::scan::decode::{Detection, decode_frame};
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Terminal states of a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A barcode payload was decoded
    Found(String),
    /// The user cancelled (or an optional deadline expired)
    Cancelled,
    /// The device could not be opened or stopped delivering frames
    DeviceError,
}

impl ScanOutcome {
    /// The decoded payload, when there is one
    pub fn payload(&self) -> Option<&str> {
        match self {
            ScanOutcome::Found(code) => Some(code),
            _ => None,
        }
    }
}

/// Loop tuning knobs
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Vertical step between scanned rows per decode attempt
    pub row_step: u32,
    /// Overall deadline; `None` leaves the loop running until the user
    /// acts, which is the intended behavior for interactive use
    pub deadline: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            row_step: DEFAULT_ROW_STEP,
            deadline: None,
        }
    }
}

/// Visual feedback sink for the scan loop
///
/// All of this is cosmetic with respect to the loop's contract; a UI
/// that draws nothing still yields a correct scan. UI errors are treated
/// as cancellation, not as scan failures.
pub trait ScanUi {
    /// Show a frame, possibly with an active detection overlay
    fn present(&mut self, frame: &CameraFrame, detection: Option<&Detection>) -> io::Result<()>;

    /// Check whether the user asked to cancel since the last poll
    fn poll_cancel(&mut self) -> io::Result<bool>;

    /// Show the confirmation view for a successful decode and hold it
    /// briefly so the user sees what was recognized
    fn confirm(&mut self, frame: &CameraFrame, detection: &Detection) -> io::Result<()>;
}

/// Run the acquisition loop to a terminal state
///
/// Takes ownership of the frame source and drops it before returning,
/// so the capture device is released exactly once on every exit path.
pub fn run<S, U>(mut source: S, ui: &mut U, options: &SessionOptions) -> ScanOutcome
where
    S: FrameSource,
    U: ScanUi,
{
    let started = Instant::now();

    let outcome = loop {
        let frame = match source.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Frame read failed, ending scan");
                break ScanOutcome::DeviceError;
            }
        };

        let gray = frame.to_luma();
        if let Some(detection) = decode_frame(&gray, options.row_step) {
            info!(
                payload = %detection.payload,
                orientation = ?detection.orientation,
                "Barcode recognized"
            );
            if let Err(e) = ui.confirm(&frame, &detection) {
                debug!(error = %e, "Confirmation view failed");
            }
            break ScanOutcome::Found(detection.payload);
        }

        if let Err(e) = ui.present(&frame, None) {
            warn!(error = %e, "Preview failed, treating as cancellation");
            break ScanOutcome::Cancelled;
        }

        match ui.poll_cancel() {
            Ok(true) => {
                info!("Scan cancelled by user");
                break ScanOutcome::Cancelled;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "Cancel polling failed, treating as cancellation");
                break ScanOutcome::Cancelled;
            }
        }

        if let Some(deadline) = options.deadline
            && started.elapsed() >= deadline
        {
            info!(?deadline, "Scan deadline reached");
            break ScanOutcome::Cancelled;
        }
    };

    // Release the capture device before handing the outcome back
    drop(source);
    outcome
}
