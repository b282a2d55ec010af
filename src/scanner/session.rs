// SPDX-License-Identifier: GPL-3.0-only

//! Decode session
//!
//! A scan session owns the open camera stream and drives the decode engine
//! on a worker thread: drain the frame channel, forward the newest frame to
//! the preview sink, feed it to the engine, and deliver the first result
//! exactly once.
//!
//! Exactly-once and no-late-callback both hang on the generation counter:
//! the session may invoke the host callback only after claiming completion
//! under the shared lock, and `stop()`/`teardown()` bump the generation
//! before signalling the thread, so a claim can never race a stop.

use super::ScanState;
use crate::backends::camera::types::FrameSender;
use crate::backends::camera::{CameraStream, LoopController};
use crate::constants::SESSION_IDLE_POLL;
use crate::decoder::DecodeEngine;
use crate::errors::ScanError;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Host-supplied scan callback
pub type ScanCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Shared decode engine handle, returned to the widget between sessions
pub type SharedEngine = Arc<Mutex<Box<dyn DecodeEngine>>>;

/// State shared between the widget and its session thread
pub(crate) struct SharedState {
    pub state: ScanState,
    pub generation: u64,
    pub last_error: Option<ScanError>,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            state: ScanState::Idle,
            generation: 0,
            last_error: None,
        }
    }
}

/// A running decode session
pub(crate) struct ScanSession {
    controller: LoopController,
}

impl ScanSession {
    /// Spawn the session thread for an open camera stream
    ///
    /// `generation` is the value current at spawn time; the session loses
    /// its claim on the callback the moment the widget bumps it.
    pub fn spawn(
        stream: CameraStream,
        engine: SharedEngine,
        on_scan: ScanCallback,
        shared: Arc<Mutex<SharedState>>,
        generation: u64,
        preview: Option<FrameSender>,
    ) -> Self {
        let controller = LoopController::spawn("scan-session", move |stop| {
            session_loop(stream, engine, on_scan, shared, generation, preview, stop);
        });
        Self { controller }
    }

    /// Stop the session and wait for its thread (and the camera) to wind down
    pub fn stop(mut self) {
        self.controller.stop();
    }
}

fn session_loop(
    mut stream: CameraStream,
    engine: SharedEngine,
    on_scan: ScanCallback,
    shared: Arc<Mutex<SharedState>>,
    generation: u64,
    mut preview: Option<FrameSender>,
    stop: Arc<std::sync::atomic::AtomicBool>,
) {
    let device_label = stream.device().label.clone();
    debug!(device = %device_label, "Scan session started");

    while !stop.load(Ordering::SeqCst) {
        // Drain the channel: scanning only ever wants the newest frame
        let mut latest = None;
        while let Some(frame) = stream.try_next_frame() {
            latest = Some(frame);
        }

        let Some(frame) = latest else {
            if !stream.is_live() {
                warn!(device = %device_label, "Camera stream ended unexpectedly");
                let mut state = shared.lock().unwrap();
                if state.generation == generation && state.state == ScanState::Scanning {
                    state.state = ScanState::Idle;
                    state.generation += 1;
                    state.last_error =
                        Some(ScanError::CameraAccess("camera stream ended".into()));
                }
                break;
            }
            std::thread::sleep(SESSION_IDLE_POLL);
            continue;
        };

        if let Some(sink) = preview.as_mut() {
            // Preview is best-effort; a full channel just drops the frame
            let _ = sink.try_send(frame.clone());
        }

        let result = engine.lock().unwrap().decode(&frame);
        if let Some(text) = result {
            let claimed = {
                let mut state = shared.lock().unwrap();
                if state.generation == generation && state.state == ScanState::Scanning {
                    state.state = ScanState::Idle;
                    state.generation += 1;
                    true
                } else {
                    false
                }
            };

            if claimed {
                info!(device = %device_label, "Scan complete");
                on_scan(text);
                engine.lock().unwrap().reset();
            } else {
                debug!(device = %device_label, "Result discarded, session superseded");
            }
            break;
        }
    }

    // Dropping the stream stops the capture thread and releases the camera
    stream.close();
    debug!(device = %device_label, "Scan session ended");
}
