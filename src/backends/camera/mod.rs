// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! Trait-based abstraction over the platform camera capability, so the
//! scanner widget can be driven by real hardware or by a scripted source
//! in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Scanner Widget     │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← enumerate / open stream
//! └──────────┬──────────┘
//!            │
//!      ┌─────┴─────┐
//!      ▼           ▼
//!  ┌───────┐  ┌─────────┐
//!  │ V4L2  │  │ Virtual │
//!  └───────┘  └─────────┘
//! ```

pub mod frame_loop;
pub mod types;
pub mod v4l2;
pub mod virtual_source;

pub use frame_loop::LoopController;
pub use types::*;

use tracing::debug;

/// Camera capability consumed by the scanner widget
///
/// All camera backends must implement this trait to provide:
/// - Device enumeration (video-input devices only)
/// - Opening a frame stream for a chosen device
/// - Platform availability probing
pub trait CameraBackend: Send + Sync {
    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// Check if this backend is usable on the current system
    fn is_available(&self) -> bool;

    /// Enumerate available video-input devices
    fn enumerate(&self) -> Vec<CameraDevice>;

    /// Open the device and start pushing frames into a bounded channel
    ///
    /// The `facing` hint mirrors what the selection policy requested;
    /// backends that cannot influence facing record it for diagnostics.
    /// The returned stream owns the capture thread; dropping it (or calling
    /// [`CameraStream::close`]) releases the camera.
    fn open_stream(
        &self,
        device: &CameraDevice,
        facing: FacingMode,
    ) -> BackendResult<CameraStream>;
}

/// An open camera stream
///
/// Holds the receiving end of the frame channel and the capture-thread
/// controller. The camera resource is released when this is dropped.
pub struct CameraStream {
    device: CameraDevice,
    receiver: FrameReceiver,
    controller: LoopController,
}

impl CameraStream {
    pub fn new(device: CameraDevice, receiver: FrameReceiver, controller: LoopController) -> Self {
        Self {
            device,
            receiver,
            controller,
        }
    }

    /// The device this stream was opened on
    pub fn device(&self) -> &CameraDevice {
        &self.device
    }

    /// Non-blocking receive of the next pending frame
    ///
    /// Returns `None` both when no frame is pending and when the capture
    /// thread has ended; use [`CameraStream::is_live`] to distinguish.
    pub fn try_next_frame(&mut self) -> Option<CameraFrame> {
        match self.receiver.try_next() {
            Ok(Some(frame)) => Some(frame),
            _ => None,
        }
    }

    /// Whether the capture thread is still producing frames
    pub fn is_live(&self) -> bool {
        self.controller.is_running()
    }

    /// Release the camera, waiting for the capture thread to exit
    pub fn close(mut self) {
        debug!(device = %self.device.label, "Closing camera stream");
        self.controller.stop();
    }
}

/// Get a concrete backend instance for the given type
pub fn get_backend_for_type(backend_type: CameraBackendType) -> Box<dyn CameraBackend> {
    match backend_type {
        CameraBackendType::V4l2 => Box::new(v4l2::V4l2Backend::new()),
        CameraBackendType::Virtual => Box::new(virtual_source::VirtualBackend::with_test_pattern()),
    }
}
