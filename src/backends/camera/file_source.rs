// SPDX-License-Identifier: GPL-3.0-only

//! File-backed frame source
//!
//! Serves a fixed sequence of still-image files as camera frames, so the
//! scan loop can run end to end without a camera. Integration tests are
//! the main consumer.

use super::types::{BackendError, BackendResult, CameraFrame, FrameSource};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Frame source that reads image files in order
///
/// Each `read_frame` call loads the next file. When the sequence is
/// exhausted the source reports a read failure, which the scan loop
/// treats like a camera that stopped delivering frames.
pub struct FileSource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl FileSource {
    /// Create a source over the given image files
    pub fn new(paths: Vec<PathBuf>) -> BackendResult<Self> {
        if paths.is_empty() {
            return Err(BackendError::DeviceUnavailable("no input files".into()));
        }
        info!(count = paths.len(), "File source opened");
        Ok(Self { paths, next: 0 })
    }

    /// Number of frames read so far
    pub fn frames_read(&self) -> usize {
        self.next
    }
}

impl FrameSource for FileSource {
    fn read_frame(&mut self) -> BackendResult<CameraFrame> {
        let Some(path) = self.paths.get(self.next) else {
            return Err(BackendError::ReadFailed("end of file sequence".into()));
        };
        self.next += 1;
        load_image_as_frame(path)
    }
}

impl Drop for FileSource {
    fn drop(&mut self) {
        debug!(frames_read = self.next, "File source closed");
    }
}

/// Load an image file and convert it to a CameraFrame
///
/// Supports the formats the `image` crate reads (PNG, JPEG, BMP, ...).
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let img = image::open(path).map_err(|e| {
        BackendError::ReadFailed(format!("failed to load image '{}': {}", path.display(), e))
    })?;

    let rgb = img.to_rgb8();
    debug!(
        path = %path.display(),
        width = rgb.width(),
        height = rgb.height(),
        "Image loaded"
    );

    Ok(CameraFrame::from_rgb(rgb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;

    #[test]
    fn test_empty_file_list_is_rejected() {
        assert!(matches!(
            FileSource::new(Vec::new()),
            Err(BackendError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn test_frames_served_in_order_then_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("a.png");
        let second = dir.path().join("b.png");
        image::GrayImage::from_pixel(4, 4, image::Luma([10]))
            .save(&first)
            .expect("save");
        image::GrayImage::from_pixel(8, 4, image::Luma([200]))
            .save(&second)
            .expect("save");

        let mut source = FileSource::new(vec![first, second]).expect("source");

        let frame = source.read_frame().expect("first frame");
        assert_eq!((frame.width, frame.height), (4, 4));
        assert_eq!(frame.format, PixelFormat::Rgb24);

        let frame = source.read_frame().expect("second frame");
        assert_eq!((frame.width, frame.height), (8, 4));

        assert!(matches!(
            source.read_frame(),
            Err(BackendError::ReadFailed(_))
        ));
        assert_eq!(source.frames_read(), 2);
    }

    #[test]
    fn test_missing_file_is_a_read_failure() {
        let mut source =
            FileSource::new(vec![PathBuf::from("/nonexistent/frame.png")]).expect("source");
        assert!(matches!(
            source.read_frame(),
            Err(BackendError::ReadFailed(_))
        ));
    }
}
