// SPDX-License-Identifier: GPL-3.0-only

//! Scanner widget
//!
//! Coordinates camera-device selection, an open camera stream, and the
//! decode engine, and owns the session lifecycle: a session is created on
//! `start` and destroyed on `stop`, on the first decoded result, or on
//! widget teardown, whichever comes first. At most one session and one
//! open camera stream exist per widget instance.
//!
//! Failures are never propagated to the host: they are logged, recorded as
//! the last error, and the widget reverts to Idle so a retry is possible.

pub mod policy;
pub mod session;

pub use policy::SelectionPolicy;

use crate::backends::camera::CameraBackend;
use crate::backends::camera::types::{CameraDevice, FrameSender};
use crate::decoder::DecodeEngine;
use crate::errors::ScanError;
use session::{ScanCallback, ScanSession, SharedEngine, SharedState};

use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Scan session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Scanning,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Idle => write!(f, "Idle"),
            ScanState::Scanning => write!(f, "Scanning"),
        }
    }
}

/// Barcode scanner widget
///
/// Constructed with a camera backend, a decode engine, a selection policy,
/// and the host callback. The callback is invoked exactly once per scan
/// session, with the decoded text, after which the widget is Idle again.
pub struct BarcodeScanner {
    backend: Box<dyn CameraBackend>,
    engine: SharedEngine,
    policy: SelectionPolicy,
    on_scan: ScanCallback,
    shared: Arc<Mutex<SharedState>>,
    devices: Vec<CameraDevice>,
    selected: Option<String>,
    session: Option<ScanSession>,
    preview: Option<FrameSender>,
}

impl BarcodeScanner {
    pub fn new<F>(
        backend: Box<dyn CameraBackend>,
        engine: Box<dyn DecodeEngine>,
        policy: SelectionPolicy,
        on_scan: F,
    ) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        Self {
            backend,
            engine: Arc::new(Mutex::new(engine)),
            policy,
            on_scan: Arc::new(on_scan),
            shared: Arc::new(Mutex::new(SharedState::new())),
            devices: Vec::new(),
            selected: None,
            session: None,
            preview: None,
        }
    }

    /// Sink for live preview frames, handed to every subsequent session
    pub fn set_preview(&mut self, sender: FrameSender) {
        self.preview = Some(sender);
    }

    /// Query the platform for video-input devices
    ///
    /// An empty result records `NoDeviceFound` (or `UnsupportedPlatform`
    /// when the backend itself is missing) and leaves the widget Idle.
    pub fn list_devices(&mut self) -> &[CameraDevice] {
        if !self.backend.is_available() {
            error!(backend = %self.backend.backend_type(), "Camera platform not available");
            self.record_error(ScanError::UnsupportedPlatform);
            self.devices.clear();
            return &self.devices;
        }

        self.devices = self.backend.enumerate();
        if self.devices.is_empty() {
            error!(backend = %self.backend.backend_type(), "No video input devices found");
            self.record_error(ScanError::NoDeviceFound);
        } else {
            debug!(count = self.devices.len(), "Enumerated video input devices");
            self.shared.lock().unwrap().last_error = None;
        }
        &self.devices
    }

    /// Devices from the most recent enumeration
    pub fn devices(&self) -> &[CameraDevice] {
        &self.devices
    }

    /// Record a device choice; no camera side effect until `start`
    pub fn select_device(&mut self, id: &str) {
        debug!(device = %id, "Device selected");
        self.selected = Some(id.to_string());
    }

    /// The currently selected device id, if any
    pub fn selected_device(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Current session state
    pub fn state(&self) -> ScanState {
        self.shared.lock().unwrap().state
    }

    /// The most recent failure, kept until the next successful operation
    pub fn last_error(&self) -> Option<ScanError> {
        self.shared.lock().unwrap().last_error.clone()
    }

    /// Start a scan session against the selected device
    ///
    /// Enumerates first when no devices are known, auto-selects per policy
    /// when the host has not chosen, and opens the camera stream with the
    /// matching facing hint. On any failure the widget stays Idle with the
    /// error recorded. A no-op while already Scanning.
    pub fn start(&mut self) {
        if self.state() == ScanState::Scanning {
            debug!("start() while already scanning, ignoring");
            return;
        }

        // Reap the handle of a session that ended on its own
        if let Some(session) = self.session.take() {
            session.stop();
        }

        if self.devices.is_empty() {
            self.list_devices();
            if self.devices.is_empty() {
                return;
            }
        }

        let device = match self.resolve_device() {
            Some(device) => device,
            None => {
                self.record_error(ScanError::NoDeviceFound);
                return;
            }
        };
        self.selected = Some(device.id.clone());

        let facing = policy::facing_hint(&device);
        let stream = match self.backend.open_stream(&device, facing) {
            Ok(stream) => stream,
            Err(e) => {
                error!(device = %device.label, error = %e, "Failed to open camera");
                self.record_error(e.into());
                return;
            }
        };

        let generation = {
            let mut state = self.shared.lock().unwrap();
            state.state = ScanState::Scanning;
            state.last_error = None;
            state.generation
        };

        let engine_name = self.engine.lock().unwrap().name();
        info!(device = %device.label, facing = %facing, engine = engine_name, "Scan session starting");

        self.session = Some(ScanSession::spawn(
            stream,
            Arc::clone(&self.engine),
            Arc::clone(&self.on_scan),
            Arc::clone(&self.shared),
            generation,
            self.preview.clone(),
        ));
    }

    /// Stop the active session and release the camera
    ///
    /// Idempotent; safe to call while a start is still winding up. After
    /// this returns, no late `on_scan` callback can fire.
    pub fn stop(&mut self) {
        {
            // Bumping the generation first is what revokes the session's
            // claim on the callback
            let mut state = self.shared.lock().unwrap();
            state.generation += 1;
            state.state = ScanState::Idle;
        }

        if let Some(session) = self.session.take() {
            debug!("Stopping scan session");
            session.stop();
        }

        self.engine.lock().unwrap().reset();
    }

    /// Guaranteed resource release for widget destruction
    ///
    /// Equivalent to [`BarcodeScanner::stop`]; also invoked from `Drop` so
    /// the camera cannot leak when the host forgets to call it.
    pub fn teardown(&mut self) {
        self.stop();
    }

    /// Resolve the device to scan with: explicit selection first, then the
    /// policy default
    fn resolve_device(&self) -> Option<CameraDevice> {
        if let Some(id) = &self.selected {
            if let Some(device) = self.devices.iter().find(|d| &d.id == id) {
                return Some(device.clone());
            }
            warn!(device = %id, "Selected device no longer present, falling back to policy");
        }
        policy::pick_device(self.policy, &self.devices).cloned()
    }

    fn record_error(&self, err: ScanError) {
        self.shared.lock().unwrap().last_error = Some(err);
    }
}

impl Drop for BarcodeScanner {
    fn drop(&mut self) {
        self.teardown();
    }
}
