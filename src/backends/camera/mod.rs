// SPDX-License-Identifier: GPL-3.0-only

//! Camera frame sources
//!
//! This module provides the blocking frame source abstraction used by the
//! scan loop, a V4L2 implementation for real cameras, a file-backed
//! implementation for offline decoding and tests, and device enumeration
//! via the `VIDIOC_QUERYCAP` ioctl.

pub mod file_source;
pub mod types;
pub mod v4l2;

use self::types::DeviceInfo;
use std::os::unix::io::{AsRawFd, RawFd};
use tracing::debug;

/// VIDIOC_QUERYCAP ioctl number
const VIDIOC_QUERYCAP: libc::c_ulong = 0x80685600;

/// V4L2 capability structure for VIDIOC_QUERYCAP ioctl
#[repr(C)]
struct V4l2Capability {
    driver: [u8; 16],
    card: [u8; 32],
    bus_info: [u8; 32],
    version: u32,
    capabilities: u32,
    device_caps: u32,
    reserved: [u32; 3],
}

/// Query V4L2 capabilities for an open file descriptor.
///
/// Issues the `VIDIOC_QUERYCAP` ioctl and returns the capability struct,
/// or `None` if the ioctl fails.
fn query_v4l2_cap(fd: RawFd) -> Option<V4l2Capability> {
    let mut cap: V4l2Capability = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(fd, VIDIOC_QUERYCAP as _, &mut cap as *mut V4l2Capability) };
    if result < 0 { None } else { Some(cap) }
}

/// Extract a NUL-terminated string from a fixed-size capability field
fn cap_string(field: &[u8]) -> String {
    let len = field.iter().position(|&c| c == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..len]).to_string()
}

/// Query card and driver names for a V4L2 device path
///
/// Opens the device and queries its capabilities. Returns None if the
/// device cannot be opened or the ioctl fails.
fn query_device_names(device_path: &str) -> Option<(String, String)> {
    let file = std::fs::File::open(device_path).ok()?;
    let cap = query_v4l2_cap(file.as_raw_fd())?;

    let card = cap_string(&cap.card);
    let driver = cap_string(&cap.driver);

    debug!(device_path, card = %card, driver = %driver, "Queried V4L2 capability");
    Some((card, driver))
}

/// Enumerate V4L2 capture devices
///
/// Scans `/dev/video*` and queries each device's card and driver names.
/// Devices that cannot be opened are skipped. The result is sorted by
/// device index.
pub fn enumerate_devices() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    let Ok(entries) = std::fs::read_dir("/dev") else {
        return devices;
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(index) = name.strip_prefix("video").and_then(|n| n.parse::<usize>().ok()) else {
            continue;
        };

        let path = format!("/dev/{}", name);
        let Some((card, driver)) = query_device_names(&path) else {
            debug!(path = %path, "Skipping unreadable video device");
            continue;
        };

        devices.push(DeviceInfo {
            index,
            path,
            card,
            driver,
        });
    }

    devices.sort_by_key(|d| d.index);
    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_string_stops_at_nul() {
        let mut field = [0u8; 16];
        field[..4].copy_from_slice(b"uvcv");
        assert_eq!(cap_string(&field), "uvcv");
    }

    #[test]
    fn test_cap_string_without_nul_uses_full_field() {
        let field = [b'x'; 8];
        assert_eq!(cap_string(&field), "xxxxxxxx");
    }
}
