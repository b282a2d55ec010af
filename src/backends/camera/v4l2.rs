// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera backend
//!
//! Enumerates `/dev/video*` capture nodes and streams frames via mmap
//! buffers on a dedicated capture thread. UVC cameras expose extra nodes
//! (metadata, output), so enumeration filters on the device capability
//! flags from `VIDIOC_QUERYCAP` rather than taking every node.

use super::frame_loop::LoopController;
use super::types::{
    BackendError, BackendResult, CameraBackendType, CameraDevice, CameraFrame, CameraLocation,
    FacingMode, FrameSender, PixelFormat,
};
use super::{CameraBackend, CameraStream};
use crate::constants::{
    CAPTURE_BUFFER_COUNT, CAPTURE_ERROR_LIMIT, CAPTURE_TARGET_HEIGHT, CAPTURE_TARGET_WIDTH,
    FRAME_CHANNEL_CAPACITY,
};

use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

/// VIDIOC_QUERYCAP ioctl number
const VIDIOC_QUERYCAP: libc::c_ulong = 0x80685600;

/// V4L2_CAP_VIDEO_CAPTURE capability bit
const CAP_VIDEO_CAPTURE: u32 = 0x0000_0001;

/// V4L2_CAP_META_CAPTURE capability bit (UVC metadata nodes)
const CAP_META_CAPTURE: u32 = 0x0080_0000;

/// Pixel formats tried during stream negotiation, in order of preference.
/// YUYV first: it is the most common raw webcam format and luma extraction
/// from it is a straight byte read.
const PREFERRED_FOURCCS: [&[u8; 4]; 4] = [b"YUYV", b"GREY", b"RGB3", b"AB24"];

/// V4L2 capability structure for the VIDIOC_QUERYCAP ioctl
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

/// Query V4L2 capabilities for an open file descriptor
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

/// Derive a placement hint from the device label
fn location_from_label(label: &str) -> Option<CameraLocation> {
    let lower = label.to_lowercase();
    if lower.contains("front") {
        Some(CameraLocation::Front)
    } else if lower.contains("back") || lower.contains("rear") {
        Some(CameraLocation::Back)
    } else if lower.contains("usb") || lower.contains("external") {
        Some(CameraLocation::External)
    } else {
        None
    }
}

/// V4L2 camera backend
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for V4l2Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for V4l2Backend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }

    fn is_available(&self) -> bool {
        Path::new("/dev").is_dir()
    }

    fn enumerate(&self) -> Vec<CameraDevice> {
        let mut devices = Vec::new();

        for node in v4l::context::enum_devices() {
            let path = node.path().to_path_buf();
            let path_str = path.to_string_lossy().to_string();

            // QUERYCAP needs only an open fd, not a configured device
            let Ok(file) = std::fs::File::open(&path) else {
                debug!(path = %path_str, "Skipping unopenable node");
                continue;
            };
            let Some(cap) = query_v4l2_cap(file.as_raw_fd()) else {
                continue;
            };

            // device_caps describes this node; capabilities describes the
            // whole physical device
            let node_caps = if cap.device_caps != 0 {
                cap.device_caps
            } else {
                cap.capabilities
            };
            if node_caps & CAP_VIDEO_CAPTURE == 0 || node_caps & CAP_META_CAPTURE != 0 {
                continue;
            }

            let label = match node.name() {
                Some(name) if !name.is_empty() => name,
                _ => cap_string(&cap.card),
            };

            debug!(path = %path_str, label = %label, "Found video capture node");

            devices.push(CameraDevice {
                id: path_str,
                location: location_from_label(&label),
                label,
            });
        }

        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }

    fn open_stream(
        &self,
        device: &CameraDevice,
        facing: FacingMode,
    ) -> BackendResult<CameraStream> {
        let dev = Device::with_path(&device.id).map_err(BackendError::from)?;

        let (format, pixel) = negotiate_format(&dev, &device.label)?;

        // V4L2 device nodes are already concrete cameras, so the facing
        // hint cannot change which sensor we get; it is recorded for
        // diagnostics only.
        info!(
            device = %device.label,
            facing = %facing,
            width = format.width,
            height = format.height,
            pixel_format = %pixel,
            "Opening camera stream"
        );

        let (sender, receiver) = futures::channel::mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let label = device.label.clone();
        let controller = LoopController::spawn("v4l2-capture", move |stop| {
            capture_loop(dev, format, pixel, sender, stop, &label);
        });

        Ok(CameraStream::new(device.clone(), receiver, controller))
    }
}

/// Negotiate a capture format the decoder can consume
///
/// Requests a small scan-friendly resolution for each preferred FourCC and
/// accepts the first one the driver actually honours.
fn negotiate_format(dev: &Device, label: &str) -> BackendResult<(Format, PixelFormat)> {
    for fourcc in PREFERRED_FOURCCS {
        let requested = Format::new(
            CAPTURE_TARGET_WIDTH,
            CAPTURE_TARGET_HEIGHT,
            FourCC::new(fourcc),
        );
        let actual = match dev.set_format(&requested) {
            Ok(actual) => actual,
            Err(e) => {
                debug!(device = %label, fourcc = %FourCC::new(fourcc), error = %e, "Format rejected");
                continue;
            }
        };
        if let Some(pixel) = PixelFormat::from_fourcc(&actual.fourcc.repr) {
            return Ok((actual, pixel));
        }
    }

    Err(BackendError::FormatNotSupported(format!(
        "{} offers no raw format the decoder understands",
        label
    )))
}

/// Capture loop body: drains mmap buffers into the frame channel
fn capture_loop(
    dev: Device,
    format: Format,
    pixel: PixelFormat,
    mut sender: FrameSender,
    stop: Arc<AtomicBool>,
    label: &str,
) {
    let mut stream = match Stream::with_buffers(&dev, Type::VideoCapture, CAPTURE_BUFFER_COUNT) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(device = %label, error = %e, "Failed to map capture buffers");
            return;
        }
    };

    let stride = if format.stride > 0 {
        format.stride
    } else {
        format.width * pixel.bytes_per_pixel()
    };

    let mut consecutive_errors = 0u32;

    while !stop.load(Ordering::SeqCst) {
        match stream.next() {
            Ok((buf, _meta)) => {
                consecutive_errors = 0;
                let frame = CameraFrame {
                    width: format.width,
                    height: format.height,
                    data: Arc::from(buf),
                    format: pixel,
                    stride,
                    captured_at: Instant::now(),
                };
                if let Err(e) = sender.try_send(frame) {
                    if e.is_disconnected() {
                        debug!(device = %label, "Frame channel closed, ending capture");
                        break;
                    }
                    // Channel full: the session is behind, drop the frame
                }
            }
            Err(e) => {
                consecutive_errors += 1;
                warn!(device = %label, error = %e, "Capture error");
                if consecutive_errors >= CAPTURE_ERROR_LIMIT {
                    warn!(device = %label, "Too many capture errors, ending stream");
                    break;
                }
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_string_stops_at_nul() {
        let mut field = [0u8; 32];
        field[..6].copy_from_slice(b"Webcam");
        assert_eq!(cap_string(&field), "Webcam");
    }

    #[test]
    fn test_location_from_label() {
        assert_eq!(
            location_from_label("Integrated Front Camera"),
            Some(CameraLocation::Front)
        );
        assert_eq!(
            location_from_label("Rear module"),
            Some(CameraLocation::Back)
        );
        assert_eq!(
            location_from_label("USB2.0 HD UVC WebCam"),
            Some(CameraLocation::External)
        );
        assert_eq!(location_from_label("Unknown sensor"), None);
    }
}
