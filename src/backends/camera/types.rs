// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// V4L2 kernel devices (/dev/video*)
    #[default]
    V4l2,
    /// Scripted in-process source, no hardware required
    Virtual,
}

impl CameraBackendType {
    /// Parse a backend name as given on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "v4l2" | "v4l" => Some(CameraBackendType::V4l2),
            "virtual" => Some(CameraBackendType::Virtual),
            _ => None,
        }
    }
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::Virtual => write!(f, "Virtual"),
        }
    }
}

/// Physical placement of a camera, when the platform reports one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraLocation {
    Front,
    Back,
    External,
}

/// Facing-mode hint passed along with a camera request
///
/// `Environment` asks for a rear/world-facing camera, `User` for a
/// front/selfie camera. Backends that cannot influence facing (V4L2 device
/// nodes are already concrete) record the hint for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::User => write!(f, "user"),
            FacingMode::Environment => write!(f, "environment"),
        }
    }
}

/// A video-input device as reported by a backend
///
/// Read-only from the widget's perspective; the `id` is the stable handle
/// used for selection and for opening a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Stable device identifier (V4L2 device path, virtual id, ...)
    pub id: String,
    /// Human-readable label shown in selectors
    pub label: String,
    /// Placement hint, when the platform knows it
    pub location: Option<CameraLocation>,
}

impl CameraDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            location: None,
        }
    }
}

/// Pixel format of captured frames
///
/// Only formats the decoder can extract luma from are carried; backends
/// negotiate down to one of these or fail the stream open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit grayscale, single channel
    Gray8,
    /// 24-bit RGB, 3 bytes per pixel
    Rgb24,
    /// 32-bit RGBA, 4 bytes per pixel
    Rgba,
    /// Packed 4:2:2 YUV (Y0 U Y1 V), 2 bytes per pixel
    Yuyv,
}

impl PixelFormat {
    /// Bytes per pixel in the packed representation
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba => 4,
            PixelFormat::Yuyv => 2,
        }
    }

    /// Map a V4L2 FourCC to a supported pixel format
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"GREY" | b"Y8  " => Some(PixelFormat::Gray8),
            b"RGB3" => Some(PixelFormat::Rgb24),
            b"AB24" | b"RGB4" => Some(PixelFormat::Rgba),
            b"YUYV" => Some(PixelFormat::Yuyv),
            _ => None,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFormat::Gray8 => write!(f, "GRAY8"),
            PixelFormat::Rgb24 => write!(f, "RGB24"),
            PixelFormat::Rgba => write!(f, "RGBA"),
            PixelFormat::Yuyv => write!(f, "YUYV"),
        }
    }
}

/// A single frame from the camera
///
/// The data buffer is shared so frames can be teed to the preview without
/// copying. `stride` is bytes per row and may include driver padding.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    pub stride: u32,
    /// Timestamp when the frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a frame with a tightly packed stride
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width * format.bytes_per_pixel(),
            data: Arc::from(data),
            format,
            captured_at: Instant::now(),
        }
    }
}

/// Frame sender type for capture streams
pub type FrameSender = futures::channel::mpsc::Sender<CameraFrame>;

/// Frame receiver type for capture streams
pub type FrameReceiver = futures::channel::mpsc::Receiver<CameraFrame>;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Opening the device was refused (permissions, device busy)
    AccessDenied(String),
    /// Stream setup failed after the device was opened
    InitializationFailed(String),
    /// The device offers no pixel format the decoder understands
    FormatNotSupported(String),
    /// General I/O error
    Io(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::AccessDenied(msg) => write!(f, "Access denied: {}", msg),
            BackendError::InitializationFailed(msg) => {
                write!(f, "Initialization failed: {}", msg)
            }
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::Io(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => BackendError::AccessDenied(err.to_string()),
            std::io::ErrorKind::NotFound => BackendError::DeviceNotFound(err.to_string()),
            _ => BackendError::Io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_mapping() {
        assert_eq!(PixelFormat::from_fourcc(b"YUYV"), Some(PixelFormat::Yuyv));
        assert_eq!(PixelFormat::from_fourcc(b"GREY"), Some(PixelFormat::Gray8));
        assert_eq!(PixelFormat::from_fourcc(b"MJPG"), None);
    }

    #[test]
    fn test_packed_frame_stride() {
        let frame = CameraFrame::packed(4, 2, PixelFormat::Yuyv, vec![0u8; 16]);
        assert_eq!(frame.stride, 8);
        assert_eq!(frame.data.len(), 16);
    }

    #[test]
    fn test_backend_name_parsing() {
        assert_eq!(
            CameraBackendType::from_name("Virtual"),
            Some(CameraBackendType::Virtual)
        );
        assert_eq!(
            CameraBackendType::from_name("v4l"),
            Some(CameraBackendType::V4l2)
        );
        assert_eq!(CameraBackendType::from_name("pipewire"), None);
    }
}
