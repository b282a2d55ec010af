// SPDX-License-Identifier: GPL-3.0-only

//! Barcode decoding engine abstraction
//!
//! Decoding is delegated entirely to an external engine; the scanner only
//! feeds it camera frames and surfaces the first result. The trait keeps
//! the engine swappable (and fakeable in tests).

pub mod qr;

pub use qr::QrEngine;

use crate::backends::camera::types::CameraFrame;

/// A black-box barcode decoding engine
///
/// Implementations keep whatever internal detector state they need between
/// frames; `reset` clears it when a scan session ends.
pub trait DecodeEngine: Send {
    /// Engine name for logging
    fn name(&self) -> &'static str;

    /// Attempt to decode a barcode from one frame
    ///
    /// Returns the decoded text of the first recognized code, or `None`
    /// when the frame contains nothing decodable.
    fn decode(&mut self, frame: &CameraFrame) -> Option<String>;

    /// Clear internal state between scan sessions
    fn reset(&mut self) {}
}

/// Get the default decode engine
pub fn default_engine() -> Box<dyn DecodeEngine> {
    Box::new(QrEngine::new())
}
