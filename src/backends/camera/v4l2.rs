// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera frame source
//!
//! Captures frames from an index-selected V4L2 device using memory-mapped
//! streaming. Reads block until the driver hands over a buffer, which is
//! the pacing the interactive scan loop relies on.

use super::types::{BackendError, BackendResult, CameraFrame, FrameSource, PixelFormat};
use crate::constants::CAPTURE_BUFFER_COUNT;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::Device;
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;

/// How the driver delivers pixel data to us
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    /// Raw frames in a format we consume directly
    Raw(PixelFormat),
    /// Motion-JPEG frames, decompressed to RGB per read
    Mjpeg,
}

/// Formats we can negotiate, in preference order
///
/// YUYV is tried first because its luma plane feeds the decoder without
/// any conversion. MJPG is last since every frame costs a JPEG decode.
const PREFERRED_FOURCCS: [(&[u8; 4], SourceKind); 4] = [
    (b"YUYV", SourceKind::Raw(PixelFormat::Yuyv)),
    (b"GREY", SourceKind::Raw(PixelFormat::Gray8)),
    (b"RGB3", SourceKind::Raw(PixelFormat::Rgb24)),
    (b"MJPG", SourceKind::Mjpeg),
];

/// Open an index-selected V4L2 capture device
///
/// The returned [`Device`] owns the file descriptor; dropping it releases
/// the camera.
pub fn open_device(index: usize) -> BackendResult<Device> {
    Device::new(index).map_err(|e| {
        BackendError::DeviceUnavailable(format!("/dev/video{}: {}", index, e))
    })
}

/// Blocking frame source backed by a V4L2 mmap stream
///
/// Borrows the opened [`Device`]; the capture stream is stopped when the
/// source is dropped and the device itself is released when the owning
/// [`Device`] goes out of scope.
pub struct V4l2Source<'a> {
    stream: MmapStream<'a>,
    width: u32,
    height: u32,
    stride: u32,
    kind: SourceKind,
}

impl<'a> V4l2Source<'a> {
    /// Negotiate a pixel format and start streaming
    pub fn new(device: &'a Device) -> BackendResult<Self> {
        let current = device
            .format()
            .map_err(|e| BackendError::DeviceUnavailable(format!("format query: {}", e)))?;

        let mut negotiated = None;
        for (fourcc, kind) in PREFERRED_FOURCCS {
            let mut wanted = current.clone();
            wanted.fourcc = FourCC::new(fourcc);
            match device.set_format(&wanted) {
                Ok(got) if got.fourcc == wanted.fourcc => {
                    negotiated = Some((got, kind));
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(fourcc = %wanted.fourcc, error = %e, "Format not accepted");
                }
            }
        }

        let (format, kind) = negotiated.ok_or_else(|| {
            BackendError::InvalidFormat(format!(
                "device offers no supported pixel format (current: {})",
                current.fourcc
            ))
        })?;

        info!(
            width = format.width,
            height = format.height,
            fourcc = %format.fourcc,
            "Camera format negotiated"
        );

        let stream = MmapStream::with_buffers(device, Type::VideoCapture, CAPTURE_BUFFER_COUNT)
            .map_err(|e| BackendError::DeviceUnavailable(format!("stream start: {}", e)))?;

        let stride = match kind {
            SourceKind::Raw(px) if format.stride > 0 => {
                // Sanity: drivers occasionally report a stride smaller
                // than one packed row
                format.stride.max(format.width * px.bytes_per_pixel())
            }
            SourceKind::Raw(px) => format.width * px.bytes_per_pixel(),
            SourceKind::Mjpeg => 0,
        };

        Ok(Self {
            stream,
            width: format.width,
            height: format.height,
            stride,
            kind,
        })
    }

    /// Negotiated frame dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl FrameSource for V4l2Source<'_> {
    fn read_frame(&mut self) -> BackendResult<CameraFrame> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| BackendError::ReadFailed(e.to_string()))?;

        let used = meta.bytesused as usize;
        let payload = if used > 0 && used <= buf.len() {
            &buf[..used]
        } else {
            buf
        };

        match self.kind {
            SourceKind::Raw(format) => Ok(CameraFrame {
                data: Arc::from(payload.to_vec().into_boxed_slice()),
                width: self.width,
                height: self.height,
                stride: self.stride,
                format,
                captured_at: Instant::now(),
            }),
            SourceKind::Mjpeg => {
                let image =
                    image::load_from_memory_with_format(payload, image::ImageFormat::Jpeg)
                        .map_err(|e| {
                            BackendError::ReadFailed(format!("MJPEG decode: {}", e))
                        })?;
                Ok(CameraFrame::from_rgb(image.to_rgb8()))
            }
        }
    }
}

impl Drop for V4l2Source<'_> {
    fn drop(&mut self) {
        // The mmap stream issues STREAMOFF on drop; this is just a marker
        // in the logs that the capture path shut down
        debug!("Camera capture stream stopped");
    }
}

/// Open device `index` and warn-and-None on failure
///
/// Convenience used by the CLI where an unopenable camera is reported to
/// the user as a failed scan rather than a hard error.
pub fn try_open_device(index: usize) -> Option<Device> {
    match open_device(index) {
        Ok(device) => Some(device),
        Err(e) => {
            warn!(index, error = %e, "Could not open camera");
            None
        }
    }
}
