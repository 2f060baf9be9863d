// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for scanning from image files
//!
//! Exercises the full path the offline `decode` command uses: PNG on
//! disk, file-backed frame source, grayscale conversion, and the
//! multi-orientation decode.

use bookscan::backends::camera::file_source::FileSource;
use bookscan::backends::camera::types::{BackendError, CameraFrame};
use bookscan::scan::decode::Detection;
use bookscan::scan::ean13;
use bookscan::scan::session::{self, ScanOutcome, ScanUi, SessionOptions};
use std::io;
use std::path::{Path, PathBuf};

const VALID_ISBN: &str = "9787115428028";

struct NullUi;

impl ScanUi for NullUi {
    fn present(&mut self, _frame: &CameraFrame, _detection: Option<&Detection>) -> io::Result<()> {
        Ok(())
    }

    fn poll_cancel(&mut self) -> io::Result<bool> {
        Ok(false)
    }

    fn confirm(&mut self, _frame: &CameraFrame, _detection: &Detection) -> io::Result<()> {
        Ok(())
    }
}

fn write_blank(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    image::GrayImage::from_pixel(240, 160, image::Luma([240]))
        .save(&path)
        .expect("save blank");
    path
}

fn write_barcode(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    ean13::synthesize_image(VALID_ISBN, 2, 24)
        .expect("fixture")
        .save(&path)
        .expect("save barcode");
    path
}

#[test]
fn test_scan_finds_code_after_blank_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = vec![
        write_blank(dir.path(), "empty1.png"),
        write_blank(dir.path(), "empty2.png"),
        write_barcode(dir.path(), "isbn.png"),
    ];

    let source = FileSource::new(paths).expect("source");
    let outcome = session::run(source, &mut NullUi, &SessionOptions::default());

    assert_eq!(outcome, ScanOutcome::Found(VALID_ISBN.to_string()));
}

#[test]
fn test_exhausted_file_sequence_ends_as_device_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = vec![write_blank(dir.path(), "empty.png")];

    let source = FileSource::new(paths).expect("source");
    let outcome = session::run(source, &mut NullUi, &SessionOptions::default());

    assert_eq!(outcome, ScanOutcome::DeviceError);
}

#[test]
fn test_unreadable_file_ends_as_device_error() {
    let source =
        FileSource::new(vec![PathBuf::from("/nonexistent/frame.png")]).expect("source");
    let outcome = session::run(source, &mut NullUi, &SessionOptions::default());

    assert_eq!(outcome, ScanOutcome::DeviceError);
}

#[test]
fn test_open_failure_happens_before_any_read() {
    // An empty file list is the file-backed analogue of a camera that
    // cannot be opened: construction fails, so no frame is ever read.
    assert!(matches!(
        FileSource::new(Vec::new()),
        Err(BackendError::DeviceUnavailable(_))
    ));
}

#[test]
fn test_png_roundtrip_preserves_decodability() {
    // The barcode fixture survives PNG encode/decode and the RGB to
    // luma conversion done when loading files as frames.
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_barcode(dir.path(), "isbn.png");

    let mut source = FileSource::new(vec![path]).expect("source");
    use bookscan::backends::camera::types::FrameSource;
    let frame = source.read_frame().expect("frame");

    let detection =
        bookscan::scan::decode::decode_frame(&frame.to_luma(), 4).expect("detected");
    assert_eq!(detection.payload, VALID_ISBN);
    assert!(detection.region.is_some());
}
