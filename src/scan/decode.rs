// SPDX-License-Identifier: GPL-3.0-only

//! Multi-orientation decode step
//!
//! Books are often held with the spine barcode rotated 90° from the
//! camera's default orientation, so a frame that fails to decode upright
//! is retried rotated 90° clockwise and then 90° counter-clockwise.
//! There is no 180° pass; upside-down symbols go undetected.

use crate::constants::DEFAULT_ROW_STEP;
use crate::scan::ean13;
use image::GrayImage;
use image::imageops;
use tracing::{debug, trace};

/// Pixel-space bounding region of a detected symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Which orientation pass produced a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Decoded at 0°
    Upright,
    /// Decoded after rotating the frame 90° clockwise
    Clockwise,
    /// Decoded after rotating the frame 90° counter-clockwise
    CounterClockwise,
}

/// A decoded EAN-13 payload with optional location feedback
///
/// `region` is present only for upright detections. Rotated detections
/// carry coordinates in the rotated frame's space and are not mapped
/// back to the source frame, so no region is reported for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// The decoded EAN-13 payload (an ISBN-13 on book covers)
    pub payload: String,
    /// Bounding region in the frame, when known
    pub region: Option<Region>,
    /// Orientation pass that found the symbol
    pub orientation: Orientation,
}

/// Attempt to decode one grayscale frame at 0°, +90°, and -90°
///
/// Returns the first symbol found, or `None` if no orientation pass
/// yields one. When several symbols are visible the choice among them is
/// unspecified.
pub fn decode_frame(gray: &GrayImage, row_step: u32) -> Option<Detection> {
    let step = if row_step == 0 { DEFAULT_ROW_STEP } else { row_step };

    if let Some(symbol) = ean13::scan_image(gray, step) {
        debug!(payload = %symbol.text, x = symbol.x, y = symbol.y, "Decoded upright");
        return Some(Detection {
            payload: symbol.text,
            region: Some(Region {
                x: symbol.x,
                y: symbol.y,
                width: symbol.width,
                height: symbol.height,
            }),
            orientation: Orientation::Upright,
        });
    }

    trace!("No upright symbol, trying rotated passes");

    let clockwise = imageops::rotate90(gray);
    if let Some(symbol) = ean13::scan_image(&clockwise, step) {
        debug!(payload = %symbol.text, "Decoded after 90° clockwise rotation");
        return Some(Detection {
            payload: symbol.text,
            region: None,
            orientation: Orientation::Clockwise,
        });
    }

    let counter_clockwise = imageops::rotate270(gray);
    if let Some(symbol) = ean13::scan_image(&counter_clockwise, step) {
        debug!(payload = %symbol.text, "Decoded after 90° counter-clockwise rotation");
        return Some(Detection {
            payload: symbol.text,
            region: None,
            orientation: Orientation::CounterClockwise,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_ISBN: &str = "9780306406157";

    #[test]
    fn test_upright_detection_has_region() {
        let image = ean13::synthesize_image(VALID_ISBN, 2, 20).expect("image");
        let detection = decode_frame(&image, 4).expect("found");

        assert_eq!(detection.payload, VALID_ISBN);
        assert_eq!(detection.orientation, Orientation::Upright);
        let region = detection.region.expect("upright detections carry a region");
        assert!(region.width > 0 && region.height > 0);
    }

    #[test]
    fn test_rotated_detection_has_no_region() {
        // Rotating the upright fixture counter-clockwise means the
        // clockwise pass inside decode_frame restores it
        let upright = ean13::synthesize_image(VALID_ISBN, 2, 20).expect("image");
        let rotated = imageops::rotate270(&upright);

        let detection = decode_frame(&rotated, 4).expect("found");
        assert_eq!(detection.payload, VALID_ISBN);
        assert_eq!(detection.orientation, Orientation::Clockwise);
        assert!(detection.region.is_none());
    }

    #[test]
    fn test_counter_clockwise_pass() {
        let upright = ean13::synthesize_image(VALID_ISBN, 2, 20).expect("image");
        let rotated = imageops::rotate90(&upright);

        let detection = decode_frame(&rotated, 4).expect("found");
        assert_eq!(detection.orientation, Orientation::CounterClockwise);
        assert!(detection.region.is_none());
    }

    #[test]
    fn test_blank_frame_decodes_nothing() {
        let blank = GrayImage::from_pixel(320, 240, image::Luma([255]));
        assert!(decode_frame(&blank, 4).is_none());
    }

    #[test]
    fn test_upside_down_is_a_known_gap() {
        // No 180° pass: a fully inverted frame goes undetected.
        // EAN-13 is not mirror-symmetric, so the upright pass cannot
        // read it either.
        let upright = ean13::synthesize_image(VALID_ISBN, 2, 20).expect("image");
        let flipped = imageops::rotate180(&upright);
        assert!(decode_frame(&flipped, 4).is_none());
    }
}
