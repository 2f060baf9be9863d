// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for frame source backends

use image::GrayImage;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors raised by frame source backends
///
/// The scan loop treats `DeviceUnavailable` and `ReadFailed` identically
/// (the scan ends without a result); they are kept separate so logs and
/// future callers can tell an absent camera from one that died mid-stream.
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Device could not be opened
    DeviceUnavailable(String),
    /// Frame read failed mid-stream
    ReadFailed(String),
    /// Device produced a pixel format we cannot consume
    InvalidFormat(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::DeviceUnavailable(msg) => write!(f, "Device unavailable: {}", msg),
            BackendError::ReadFailed(msg) => write!(f, "Frame read failed: {}", msg),
            BackendError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Single-channel 8-bit intensity
    Gray8,
    /// Packed 24-bit RGB
    Rgb24,
    /// Packed 4:2:2 YUV (Y0 U Y1 V), the common webcam format
    Yuyv,
}

impl PixelFormat {
    /// Bytes per pixel for stride calculations
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Yuyv => 2,
        }
    }
}

/// A single captured raster frame
///
/// Frame data is reference counted so frames can be handed to the UI and
/// the decoder without copying.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Raw pixel data
    pub data: Arc<[u8]>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Bytes per row (may exceed width * bytes_per_pixel)
    pub stride: u32,
    /// Pixel layout of `data`
    pub format: PixelFormat,
    /// When the frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a frame from a tightly packed grayscale image
    pub fn from_gray(image: GrayImage) -> Self {
        let width = image.width();
        let height = image.height();
        let data: Vec<u8> = image.into_raw();
        Self {
            data: Arc::from(data.into_boxed_slice()),
            width,
            height,
            stride: width,
            format: PixelFormat::Gray8,
            captured_at: Instant::now(),
        }
    }

    /// Build a frame from a tightly packed RGB image
    pub fn from_rgb(image: image::RgbImage) -> Self {
        let width = image.width();
        let height = image.height();
        let data: Vec<u8> = image.into_raw();
        Self {
            data: Arc::from(data.into_boxed_slice()),
            width,
            height,
            stride: width * 3,
            format: PixelFormat::Rgb24,
            captured_at: Instant::now(),
        }
    }

    /// Convert the frame to a single-channel intensity image
    ///
    /// This is the first step of every decode attempt. Stride padding is
    /// dropped in the process so the result is tightly packed.
    pub fn to_luma(&self) -> GrayImage {
        let width = self.width as usize;
        let height = self.height as usize;
        let stride = self.stride as usize;
        let mut luma = Vec::with_capacity(width * height);

        for y in 0..height {
            let row_start = y * stride;
            match self.format {
                PixelFormat::Gray8 => {
                    for x in 0..width {
                        luma.push(self.data.get(row_start + x).copied().unwrap_or(0));
                    }
                }
                PixelFormat::Rgb24 => {
                    for x in 0..width {
                        let idx = row_start + x * 3;
                        match self.data.get(idx..idx + 3) {
                            // Integer BT.601 luma approximation
                            Some(px) => luma.push(
                                ((77 * px[0] as u32 + 150 * px[1] as u32 + 29 * px[2] as u32)
                                    >> 8) as u8,
                            ),
                            None => luma.push(0),
                        }
                    }
                }
                PixelFormat::Yuyv => {
                    // Luma is every second byte: Y0 U Y1 V
                    for x in 0..width {
                        luma.push(self.data.get(row_start + x * 2).copied().unwrap_or(0));
                    }
                }
            }
        }

        GrayImage::from_raw(self.width, self.height, luma)
            .expect("luma buffer matches frame dimensions")
    }

    /// Sample a single pixel as RGB (for preview rendering)
    pub fn sample_rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let data = &self.data;

        match self.format {
            PixelFormat::Gray8 => {
                let idx = (y * self.stride + x) as usize;
                let v = data.get(idx).copied().unwrap_or(0);
                (v, v, v)
            }
            PixelFormat::Rgb24 => {
                let idx = (y * self.stride + x * 3) as usize;
                match data.get(idx..idx + 3) {
                    Some(px) => (px[0], px[1], px[2]),
                    None => (0, 0, 0),
                }
            }
            PixelFormat::Yuyv => {
                // Two pixels share chroma: Y0 U Y1 V (4 bytes per 2 pixels)
                let pair_x = (x & !1) as usize;
                let base = y as usize * self.stride as usize + pair_x * 2;
                let Some(quad) = data.get(base..base + 4) else {
                    return (0, 0, 0);
                };
                let luma = if x & 1 == 0 { quad[0] } else { quad[2] };
                yuv_to_rgb(luma, quad[1], quad[3])
            }
        }
    }
}

/// Convert YUV (BT.601) to RGB
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}

/// A blocking producer of camera frames
///
/// `read_frame` blocks the calling thread until a frame is available or
/// the device errors. Implementations release their device when dropped,
/// so a source owned by the scan loop is released on every exit path.
pub trait FrameSource {
    /// Read the next frame, blocking until one is available
    fn read_frame(&mut self) -> BackendResult<CameraFrame>;
}

/// Device information from V4L2 capability queries
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// Device index (the N in /dev/videoN)
    pub index: usize,
    /// Device path (e.g., /dev/video0)
    pub path: String,
    /// Name of the device (V4L2 card)
    pub card: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_luma_strips_stride_padding() {
        // 2x2 Gray8 frame with 2 bytes of stride padding per row
        let data: Vec<u8> = vec![
            10, 20, 0, 0, // row 0 + padding
            30, 40, 0, 0, // row 1 + padding
        ];
        let frame = CameraFrame {
            data: Arc::from(data.into_boxed_slice()),
            width: 2,
            height: 2,
            stride: 4,
            format: PixelFormat::Gray8,
            captured_at: Instant::now(),
        };

        let luma = frame.to_luma();
        assert_eq!(luma.dimensions(), (2, 2));
        assert_eq!(luma.as_raw(), &vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_to_luma_yuyv_takes_y_bytes() {
        // 2x1 YUYV frame: Y0=50 U=128 Y1=200 V=128
        let data: Vec<u8> = vec![50, 128, 200, 128];
        let frame = CameraFrame {
            data: Arc::from(data.into_boxed_slice()),
            width: 2,
            height: 1,
            stride: 4,
            format: PixelFormat::Yuyv,
            captured_at: Instant::now(),
        };

        let luma = frame.to_luma();
        assert_eq!(luma.as_raw(), &vec![50, 200]);
    }

    #[test]
    fn test_to_luma_rgb_weights_green_highest() {
        let image = image::RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgb([0, 255, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        });
        let frame = CameraFrame::from_rgb(image);

        let luma = frame.to_luma();
        assert!(luma.as_raw()[0] > luma.as_raw()[1]);
    }

    #[test]
    fn test_sample_rgb_clamps_out_of_bounds() {
        let frame = CameraFrame::from_gray(GrayImage::from_pixel(2, 2, image::Luma([99])));
        assert_eq!(frame.sample_rgb(100, 100), (99, 99, 99));
    }
}
