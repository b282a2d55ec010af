// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera backend
//!
//! A scripted in-process source that substitutes for hardware: tests drive
//! the scanner widget with it, and the `--backend virtual` flag lets the
//! terminal UI run on machines without a camera. Devices and frames are
//! supplied by the caller; an empty frame script falls back to a generated
//! test pattern.

use super::frame_loop::LoopController;
use super::types::{
    BackendError, BackendResult, CameraBackendType, CameraDevice, CameraFrame, FacingMode,
    PixelFormat,
};
use super::{CameraBackend, CameraStream};
use crate::constants::FRAME_CHANNEL_CAPACITY;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Interval between emitted frames
const FRAME_INTERVAL: Duration = Duration::from_millis(5);

/// Virtual camera backend
#[derive(Clone)]
pub struct VirtualBackend {
    devices: Vec<CameraDevice>,
    frames: Arc<Vec<CameraFrame>>,
    available: bool,
    fail_open: bool,
    last_facing: Arc<Mutex<Option<FacingMode>>>,
}

impl VirtualBackend {
    /// Backend with no devices and no frames
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            frames: Arc::new(Vec::new()),
            available: true,
            fail_open: false,
            last_facing: Arc::new(Mutex::new(None)),
        }
    }

    /// Backend with a single device emitting the generated test pattern
    pub fn with_test_pattern() -> Self {
        Self::new()
            .devices(vec![CameraDevice::new("virtual:0", "Virtual Camera")])
            .frames(vec![test_frame(320, 240)])
    }

    /// Set the scripted device list
    pub fn devices(mut self, devices: Vec<CameraDevice>) -> Self {
        self.devices = devices;
        self
    }

    /// Set the frame script, emitted in a cycle while the stream is open
    pub fn frames(mut self, frames: Vec<CameraFrame>) -> Self {
        self.frames = Arc::new(frames);
        self
    }

    /// Make `is_available` report false (platform without cameras)
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Make every `open_stream` call fail (permission / hardware failure)
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// The facing hint passed to the most recent `open_stream` call
    pub fn last_facing(&self) -> Option<FacingMode> {
        *self.last_facing.lock().unwrap()
    }
}

impl Default for VirtualBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for VirtualBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Virtual
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn enumerate(&self) -> Vec<CameraDevice> {
        self.devices.clone()
    }

    fn open_stream(
        &self,
        device: &CameraDevice,
        facing: FacingMode,
    ) -> BackendResult<CameraStream> {
        *self.last_facing.lock().unwrap() = Some(facing);

        if self.fail_open {
            return Err(BackendError::AccessDenied(format!(
                "virtual device {} refused to open",
                device.id
            )));
        }
        if !self.devices.iter().any(|d| d.id == device.id) {
            return Err(BackendError::DeviceNotFound(device.id.clone()));
        }

        info!(device = %device.label, facing = %facing, "Opening virtual stream");

        let frames = if self.frames.is_empty() {
            Arc::new(vec![test_frame(320, 240)])
        } else {
            Arc::clone(&self.frames)
        };

        let (mut sender, receiver) = futures::channel::mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let controller = LoopController::spawn("virtual-capture", move |stop| {
            let mut index = 0usize;
            while !stop.load(Ordering::SeqCst) {
                let frame = frames[index % frames.len()].clone();
                index += 1;
                if let Err(e) = sender.try_send(frame) {
                    if e.is_disconnected() {
                        debug!("Virtual frame channel closed");
                        break;
                    }
                }
                std::thread::sleep(FRAME_INTERVAL);
            }
        });

        Ok(CameraStream::new(device.clone(), receiver, controller))
    }
}

/// Generate a grayscale gradient test frame
///
/// Deliberately contains no decodable barcode, so scans against it run the
/// full pipeline without ever producing a result.
pub fn test_frame(width: u32, height: u32) -> CameraFrame {
    let mut data = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            data.push(((x + y) % 256) as u8);
        }
    }
    CameraFrame::packed(width, height, PixelFormat::Gray8, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_emits_frames() {
        let backend = VirtualBackend::with_test_pattern();
        let device = backend.enumerate().remove(0);

        let mut stream = backend.open_stream(&device, FacingMode::User).unwrap();
        std::thread::sleep(Duration::from_millis(30));

        let frame = stream.try_next_frame().expect("no frame emitted");
        assert_eq!(frame.format, PixelFormat::Gray8);
        assert_eq!(frame.width, 320);
        stream.close();
    }

    #[test]
    fn test_facing_is_recorded() {
        let backend = VirtualBackend::with_test_pattern();
        let device = backend.enumerate().remove(0);
        assert_eq!(backend.last_facing(), None);

        let stream = backend
            .open_stream(&device, FacingMode::Environment)
            .unwrap();
        assert_eq!(backend.last_facing(), Some(FacingMode::Environment));
        stream.close();
    }

    #[test]
    fn test_failing_open() {
        let backend = VirtualBackend::with_test_pattern().failing_open();
        let device = backend.enumerate().remove(0);
        assert!(matches!(
            backend.open_stream(&device, FacingMode::User),
            Err(BackendError::AccessDenied(_))
        ));
    }

    #[test]
    fn test_unknown_device_rejected() {
        let backend = VirtualBackend::with_test_pattern();
        let ghost = CameraDevice::new("virtual:9", "Ghost");
        assert!(matches!(
            backend.open_stream(&ghost, FacingMode::User),
            Err(BackendError::DeviceNotFound(_))
        ));
    }
}
