// SPDX-License-Identifier: GPL-3.0-only

//! Thread lifecycle management for capture and scan loops
//!
//! Capture loops own resources (device handles, mmap streams) that must
//! live and die on the loop thread, so the body receives the stop signal
//! and runs to completion on its own; the controller only signals and joins.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Controller for a loop running in a separate thread
///
/// The spawned body polls the stop signal between iterations. Dropping the
/// controller requests a stop and joins the thread, so a loop can never
/// outlive its owner.
pub struct LoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl LoopController {
    /// Spawn a loop thread
    ///
    /// The body receives the shared stop signal and should return promptly
    /// once it reads `true`.
    pub fn spawn<F>(name: &str, body: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        debug!(name = %name, "Starting loop thread");

        let thread_handle = thread::spawn(move || {
            body(stop_signal_clone);
            debug!(name = %name_clone, "Loop thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop thread is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting for it
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending a stop signal
    ///
    /// Useful when the loop is expected to end itself.
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Loop thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for LoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "LoopController dropped, stopping loop");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn test_stop_signal_terminates_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = LoopController::spawn("test-loop", move |stop| {
            while !stop.load(Ordering::SeqCst) {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
            }
        });

        thread::sleep(Duration::from_millis(30));
        controller.stop();
        assert!(counter.load(Ordering::SeqCst) > 0);
        assert!(!controller.is_running());
    }

    #[test]
    fn test_loop_may_end_itself() {
        let mut controller = LoopController::spawn("self-ending", |_stop| {});
        controller.join();
        assert!(!controller.is_running());
    }

    #[test]
    fn test_drop_stops_loop() {
        let stopped = Arc::new(AtomicBool::new(false));
        let stopped_clone = Arc::clone(&stopped);

        let controller = LoopController::spawn("drop-test", move |stop| {
            while !stop.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(2));
            }
            stopped_clone.store(true, Ordering::SeqCst);
        });

        drop(controller);
        assert!(stopped.load(Ordering::SeqCst));
    }
}
