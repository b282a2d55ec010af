// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Application identifier, used for the config directory
pub const APP_NAME: &str = "barcode-scanner";

/// Config file name inside the application config directory
pub const CONFIG_FILE: &str = "config.json";

/// Capacity of the capture-thread -> session frame channel
///
/// Small on purpose: scanning only ever needs the newest frame, so when the
/// session falls behind the capture thread drops frames instead of queueing.
pub const FRAME_CHANNEL_CAPACITY: usize = 10;

/// Capacity of the session -> UI preview channel
pub const PREVIEW_CHANNEL_CAPACITY: usize = 4;

/// Maximum dimension (px) a frame is downscaled to before decoding
///
/// Barcodes are typically large enough in the frame to survive this, and
/// decoding at full sensor resolution is wasted work.
pub const DECODE_MAX_DIMENSION: u32 = 640;

/// Requested capture width for scan streams
pub const CAPTURE_TARGET_WIDTH: u32 = 640;

/// Requested capture height for scan streams
pub const CAPTURE_TARGET_HEIGHT: u32 = 480;

/// Number of mmap buffers for V4L2 capture streams
pub const CAPTURE_BUFFER_COUNT: u32 = 4;

/// How long the session loop sleeps when no frame is pending
pub const SESSION_IDLE_POLL: Duration = Duration::from_millis(5);

/// Consecutive capture errors tolerated before a stream gives up
pub const CAPTURE_ERROR_LIMIT: u32 = 10;

/// Label substrings that identify a rear-facing camera (lowercase)
pub const BACK_CAMERA_KEYWORDS: [&str; 3] = ["back", "rear", "environment"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_camera_keywords_are_lowercase() {
        for keyword in BACK_CAMERA_KEYWORDS {
            assert_eq!(keyword, keyword.to_lowercase());
        }
    }

    #[test]
    fn test_channel_capacities_nonzero() {
        assert!(FRAME_CHANNEL_CAPACITY > 0);
        assert!(PREVIEW_CHANNEL_CAPACITY > 0);
    }
}
