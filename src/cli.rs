// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for headless scanner operations
//!
//! This module provides command-line functionality for:
//! - Listing available video input devices
//! - Running a one-shot scan and printing the decoded text

use barcode_scanner::backends::camera::get_backend_for_type;
use barcode_scanner::backends::camera::types::{CameraBackendType, CameraLocation};
use barcode_scanner::decoder::default_engine;
use barcode_scanner::scanner::{BarcodeScanner, ScanState, SelectionPolicy};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// List all available video input devices
pub fn list_devices(backend_type: CameraBackendType) -> Result<(), Box<dyn std::error::Error>> {
    let backend = get_backend_for_type(backend_type);

    if !backend.is_available() {
        return Err(format!("{} backend is not available on this system", backend_type).into());
    }

    let devices = backend.enumerate();
    if devices.is_empty() {
        println!("No video input devices found.");
        return Ok(());
    }

    println!("Available video input devices:");
    println!();
    for (index, device) in devices.iter().enumerate() {
        let location = match device.location {
            Some(CameraLocation::Front) => " (front)",
            Some(CameraLocation::Back) => " (back)",
            Some(CameraLocation::External) => " (external)",
            None => "",
        };
        println!("  [{}] {}{}", index, device.label, location);
        println!("      {}", device.id);
    }

    Ok(())
}

/// Run a one-shot scan and print the decoded text to stdout
///
/// `device` accepts either an index from `list` or a device id. Ctrl+C
/// cancels the scan and releases the camera before exiting.
pub fn scan(
    backend_type: CameraBackendType,
    device: Option<String>,
    policy: SelectionPolicy,
    timeout_secs: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = get_backend_for_type(backend_type);

    let (result_tx, result_rx) = std::sync::mpsc::channel::<String>();
    let result_tx = Mutex::new(result_tx);

    let mut scanner = BarcodeScanner::new(backend, default_engine(), policy, move |text| {
        let _ = result_tx.lock().unwrap().send(text);
    });

    let devices = scanner.list_devices().to_vec();
    if devices.is_empty() {
        let err = scanner
            .last_error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no devices".to_string());
        return Err(err.into());
    }

    if let Some(wanted) = device {
        // Index from `list`, or a raw device id
        let id = match wanted.parse::<usize>() {
            Ok(index) => devices
                .get(index)
                .map(|d| d.id.clone())
                .ok_or_else(|| {
                    format!("device index {} out of range (0-{})", index, devices.len() - 1)
                })?,
            Err(_) => wanted,
        };
        scanner.select_device(&id);
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_handler = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        interrupted_handler.store(true, Ordering::SeqCst);
    })?;

    scanner.start();
    if scanner.state() != ScanState::Scanning {
        let err = scanner
            .last_error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "failed to start scanning".to_string());
        return Err(err.into());
    }

    eprintln!("Scanning... (Ctrl+C to cancel)");

    let deadline = timeout_secs.map(|secs| Instant::now() + Duration::from_secs(secs));

    loop {
        if interrupted.load(Ordering::SeqCst) {
            scanner.teardown();
            return Err("scan cancelled".into());
        }
        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            scanner.teardown();
            return Err("scan timed out".into());
        }

        match result_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(text) => {
                scanner.teardown();
                println!("{}", text);
                return Ok(());
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                // The session ends itself when the camera dies; a result
                // may still be in flight at that point, so check once more
                if scanner.state() == ScanState::Idle {
                    if let Ok(text) = result_rx.recv_timeout(Duration::from_millis(50)) {
                        scanner.teardown();
                        println!("{}", text);
                        return Ok(());
                    }
                    let err = scanner
                        .last_error()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "scan ended without a result".to_string());
                    scanner.teardown();
                    return Err(err.into());
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                scanner.teardown();
                return Err("scan session ended unexpectedly".into());
            }
        }
    }
}
