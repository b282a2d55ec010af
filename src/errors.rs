// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the scanner application

use crate::backends::camera::types::BackendError;
use std::fmt;

/// Result type alias using ScanError
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors the scanner widget can record
///
/// These are never propagated to the host callback path: the widget catches
/// them, logs them, and stays (or reverts to) Idle so a retry is possible.
#[derive(Debug, Clone)]
pub enum ScanError {
    /// The platform has no camera enumeration capability
    UnsupportedPlatform,
    /// Device enumeration returned an empty list
    NoDeviceFound,
    /// Opening the camera or the capture stream failed
    CameraAccess(String),
    /// Configuration load/save errors
    Config(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::UnsupportedPlatform => {
                write!(f, "Platform does not support camera enumeration")
            }
            ScanError::NoDeviceFound => write!(f, "No video input devices found"),
            ScanError::CameraAccess(msg) => write!(f, "Camera access failed: {}", msg),
            ScanError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ScanError {}

impl From<BackendError> for ScanError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotAvailable(_) => ScanError::UnsupportedPlatform,
            BackendError::DeviceNotFound(_) => ScanError::NoDeviceFound,
            BackendError::AccessDenied(msg)
            | BackendError::InitializationFailed(msg)
            | BackendError::FormatNotSupported(msg)
            | BackendError::Io(msg)
            | BackendError::Other(msg) => ScanError::CameraAccess(msg),
        }
    }
}
