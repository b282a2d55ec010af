// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the scanner widget lifecycle
//!
//! Driven entirely by the virtual camera backend and a scripted decode
//! engine, so they run without hardware.

use barcode_scanner::backends::camera::types::{CameraDevice, FacingMode};
use barcode_scanner::backends::camera::virtual_source::VirtualBackend;
use barcode_scanner::decoder::DecodeEngine;
use barcode_scanner::errors::ScanError;
use barcode_scanner::scanner::{BarcodeScanner, ScanState, SelectionPolicy};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Scripted decode engine: returns its result only while `allow` is set
struct StubEngine {
    allow: Arc<AtomicBool>,
    result: String,
}

impl StubEngine {
    fn armed(result: &str) -> (Box<dyn DecodeEngine>, Arc<AtomicBool>) {
        let allow = Arc::new(AtomicBool::new(true));
        (
            Box::new(StubEngine {
                allow: Arc::clone(&allow),
                result: result.to_string(),
            }),
            allow,
        )
    }

    fn disarmed() -> (Box<dyn DecodeEngine>, Arc<AtomicBool>) {
        let (engine, allow) = Self::armed("late-result");
        allow.store(false, Ordering::SeqCst);
        (engine, allow)
    }
}

impl DecodeEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn decode(
        &mut self,
        _frame: &barcode_scanner::backends::camera::types::CameraFrame,
    ) -> Option<String> {
        if self.allow.load(Ordering::SeqCst) {
            Some(self.result.clone())
        } else {
            None
        }
    }
}

/// Callback that counts invocations and keeps the last text
fn counting_callback() -> (
    impl Fn(String) + Send + Sync + 'static,
    Arc<AtomicU32>,
    Arc<std::sync::Mutex<Option<String>>>,
) {
    let count = Arc::new(AtomicU32::new(0));
    let last = Arc::new(std::sync::Mutex::new(None));
    let count_clone = Arc::clone(&count);
    let last_clone = Arc::clone(&last);
    let callback = move |text: String| {
        count_clone.fetch_add(1, Ordering::SeqCst);
        *last_clone.lock().unwrap() = Some(text);
    };
    (callback, count, last)
}

fn wait_for_idle(scanner: &BarcodeScanner, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if scanner.state() == ScanState::Idle {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_start_with_no_devices_stays_idle() {
    let backend = VirtualBackend::new(); // no devices
    let (engine, _) = StubEngine::armed("unused");
    let (callback, count, _) = counting_callback();
    let mut scanner =
        BarcodeScanner::new(Box::new(backend), engine, SelectionPolicy::Auto, callback);

    scanner.start();

    assert_eq!(scanner.state(), ScanState::Idle);
    assert!(matches!(scanner.last_error(), Some(ScanError::NoDeviceFound)));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unavailable_platform_is_reported() {
    let backend = VirtualBackend::with_test_pattern().unavailable();
    let (engine, _) = StubEngine::armed("unused");
    let (callback, _, _) = counting_callback();
    let mut scanner =
        BarcodeScanner::new(Box::new(backend), engine, SelectionPolicy::Auto, callback);

    scanner.start();

    assert_eq!(scanner.state(), ScanState::Idle);
    assert!(matches!(
        scanner.last_error(),
        Some(ScanError::UnsupportedPlatform)
    ));
}

#[test]
fn test_stop_when_idle_is_a_noop() {
    let backend = VirtualBackend::with_test_pattern();
    let (engine, _) = StubEngine::disarmed();
    let (callback, count, _) = counting_callback();
    let mut scanner =
        BarcodeScanner::new(Box::new(backend), engine, SelectionPolicy::Auto, callback);

    scanner.stop();
    scanner.stop();

    assert_eq!(scanner.state(), ScanState::Idle);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_successful_decode_fires_callback_exactly_once() {
    let backend = VirtualBackend::with_test_pattern();
    let (engine, _) = StubEngine::armed("0123456789012");
    let (callback, count, last) = counting_callback();
    let mut scanner =
        BarcodeScanner::new(Box::new(backend), engine, SelectionPolicy::Auto, callback);

    scanner.start();
    assert!(wait_for_idle(&scanner, Duration::from_secs(2)));

    // Give a hypothetical duplicate invocation time to show up
    std::thread::sleep(Duration::from_millis(50));

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(last.lock().unwrap().as_deref(), Some("0123456789012"));
    assert_eq!(scanner.state(), ScanState::Idle);
}

#[test]
fn test_teardown_suppresses_in_flight_decode() {
    let backend = VirtualBackend::with_test_pattern();
    let (engine, allow) = StubEngine::disarmed();
    let (callback, count, _) = counting_callback();
    let mut scanner =
        BarcodeScanner::new(Box::new(backend), engine, SelectionPolicy::Auto, callback);

    scanner.start();
    assert_eq!(scanner.state(), ScanState::Scanning);

    scanner.teardown();
    assert_eq!(scanner.state(), ScanState::Idle);

    // Arm the engine after teardown: even if anything were still running,
    // no callback may fire now
    allow.store(true, Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_stop_during_scan_prevents_callback() {
    let backend = VirtualBackend::with_test_pattern();
    let (engine, _) = StubEngine::disarmed();
    let (callback, count, _) = counting_callback();
    let mut scanner =
        BarcodeScanner::new(Box::new(backend), engine, SelectionPolicy::Auto, callback);

    scanner.start();
    assert_eq!(scanner.state(), ScanState::Scanning);
    scanner.stop();
    assert_eq!(scanner.state(), ScanState::Idle);
    assert_eq!(count.load(Ordering::SeqCst), 0);

    // The widget stays usable for a retry
    scanner.start();
    assert_eq!(scanner.state(), ScanState::Scanning);
    scanner.stop();
}

#[test]
fn test_camera_open_failure_reverts_to_idle() {
    let backend = VirtualBackend::with_test_pattern().failing_open();
    let (engine, _) = StubEngine::armed("unused");
    let (callback, count, _) = counting_callback();
    let mut scanner =
        BarcodeScanner::new(Box::new(backend), engine, SelectionPolicy::Auto, callback);

    scanner.start();

    assert_eq!(scanner.state(), ScanState::Idle);
    assert!(matches!(scanner.last_error(), Some(ScanError::CameraAccess(_))));
    assert_eq!(count.load(Ordering::SeqCst), 0);

    // A second attempt fails the same way instead of panicking
    scanner.start();
    assert_eq!(scanner.state(), ScanState::Idle);
}

#[test]
fn test_auto_policy_picks_back_camera_with_environment_facing() {
    let backend = VirtualBackend::new().devices(vec![
        CameraDevice::new("cam:0", "Front"),
        CameraDevice::new("cam:1", "Back Camera"),
    ]);
    let probe = backend.clone();
    let (engine, _) = StubEngine::armed("result");
    let (callback, _, _) = counting_callback();
    let mut scanner =
        BarcodeScanner::new(Box::new(backend), engine, SelectionPolicy::Auto, callback);

    scanner.start();
    assert!(wait_for_idle(&scanner, Duration::from_secs(2)));

    assert_eq!(scanner.selected_device(), Some("cam:1"));
    assert_eq!(probe.last_facing(), Some(FacingMode::Environment));
}

#[test]
fn test_sole_device_defaults_with_user_facing() {
    let backend = VirtualBackend::new().devices(vec![CameraDevice::new("cam:0", "USB Cam")]);
    let probe = backend.clone();
    let (engine, _) = StubEngine::armed("result");
    let (callback, _, _) = counting_callback();
    let mut scanner =
        BarcodeScanner::new(Box::new(backend), engine, SelectionPolicy::Manual, callback);

    scanner.start();
    assert!(wait_for_idle(&scanner, Duration::from_secs(2)));

    assert_eq!(scanner.selected_device(), Some("cam:0"));
    assert_eq!(probe.last_facing(), Some(FacingMode::User));
}

#[test]
fn test_manual_selection_overrides_default() {
    let backend = VirtualBackend::new().devices(vec![
        CameraDevice::new("cam:0", "Front"),
        CameraDevice::new("cam:1", "Conference Cam"),
    ]);
    let (engine, _) = StubEngine::armed("result");
    let (callback, _, _) = counting_callback();
    let mut scanner =
        BarcodeScanner::new(Box::new(backend), engine, SelectionPolicy::Manual, callback);

    scanner.list_devices();
    scanner.select_device("cam:1");
    scanner.start();
    assert!(wait_for_idle(&scanner, Duration::from_secs(2)));

    assert_eq!(scanner.selected_device(), Some("cam:1"));
}

#[test]
fn test_select_device_has_no_camera_side_effect() {
    let backend = VirtualBackend::with_test_pattern();
    let probe = backend.clone();
    let (engine, _) = StubEngine::disarmed();
    let (callback, _, _) = counting_callback();
    let mut scanner =
        BarcodeScanner::new(Box::new(backend), engine, SelectionPolicy::Manual, callback);

    scanner.list_devices();
    scanner.select_device("virtual:0");

    // No stream was opened until start is invoked
    assert_eq!(probe.last_facing(), None);
    assert_eq!(scanner.state(), ScanState::Idle);
}

#[test]
fn test_start_while_scanning_is_a_noop() {
    let backend = VirtualBackend::with_test_pattern();
    let (engine, _) = StubEngine::disarmed();
    let (callback, count, _) = counting_callback();
    let mut scanner =
        BarcodeScanner::new(Box::new(backend), engine, SelectionPolicy::Auto, callback);

    scanner.start();
    assert_eq!(scanner.state(), ScanState::Scanning);
    scanner.start();
    assert_eq!(scanner.state(), ScanState::Scanning);

    scanner.teardown();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_widget_is_reusable_after_a_scan() {
    let backend = VirtualBackend::with_test_pattern();
    let (engine, allow) = StubEngine::armed("first");
    let (callback, count, _) = counting_callback();
    let mut scanner =
        BarcodeScanner::new(Box::new(backend), engine, SelectionPolicy::Auto, callback);

    scanner.start();
    assert!(wait_for_idle(&scanner, Duration::from_secs(2)));
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // Second session decodes again with the same engine
    allow.store(true, Ordering::SeqCst);
    scanner.start();
    assert!(wait_for_idle(&scanner, Duration::from_secs(2)));
    assert_eq!(count.load(Ordering::SeqCst), 2);
}
