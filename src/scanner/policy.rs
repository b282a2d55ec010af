// SPDX-License-Identifier: GPL-3.0-only

//! Device selection policy
//!
//! Two observed host behaviours, exposed as configuration: auto-pick a
//! rear-facing camera, or default to the first device and let the user
//! choose from a selector.

use crate::backends::camera::types::{CameraDevice, CameraLocation, FacingMode};
use crate::constants::BACK_CAMERA_KEYWORDS;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the widget chooses a device when the host did not select one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Prefer a rear-facing camera, falling back to the first device
    #[default]
    Auto,
    /// Default to the first device; user selection overrides before start
    Manual,
}

impl std::fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionPolicy::Auto => write!(f, "auto"),
            SelectionPolicy::Manual => write!(f, "manual"),
        }
    }
}

impl SelectionPolicy {
    /// Parse a policy name as given on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "auto" => Some(SelectionPolicy::Auto),
            "manual" => Some(SelectionPolicy::Manual),
            _ => None,
        }
    }
}

/// Whether a device looks rear-facing
///
/// The label keywords come first; the platform location hint covers
/// devices with unhelpful labels.
pub fn is_back_facing(device: &CameraDevice) -> bool {
    let label = device.label.to_lowercase();
    if BACK_CAMERA_KEYWORDS.iter().any(|k| label.contains(k)) {
        return true;
    }
    device.location == Some(CameraLocation::Back)
}

/// Pick the default device for the given policy
///
/// Returns `None` only when the list is empty.
pub fn pick_device<'a>(
    policy: SelectionPolicy,
    devices: &'a [CameraDevice],
) -> Option<&'a CameraDevice> {
    let picked = match policy {
        SelectionPolicy::Auto => devices
            .iter()
            .find(|d| is_back_facing(d))
            .or_else(|| devices.first()),
        SelectionPolicy::Manual => devices.first(),
    };
    if let Some(device) = picked {
        debug!(policy = %policy, device = %device.label, "Picked default device");
    }
    picked
}

/// Facing hint to pass along with the camera request
pub fn facing_hint(device: &CameraDevice) -> FacingMode {
    if is_back_facing(device) {
        FacingMode::Environment
    } else {
        FacingMode::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, label: &str) -> CameraDevice {
        CameraDevice::new(id, label)
    }

    #[test]
    fn test_auto_prefers_back_camera() {
        let devices = vec![device("0", "Front"), device("1", "Back Camera")];
        let picked = pick_device(SelectionPolicy::Auto, &devices).unwrap();
        assert_eq!(picked.label, "Back Camera");
        assert_eq!(facing_hint(picked), FacingMode::Environment);
    }

    #[test]
    fn test_auto_matches_keywords_case_insensitively() {
        for label in ["REAR sensor", "Environment cam", "back camera"] {
            let devices = vec![device("0", "Selfie"), device("1", label)];
            let picked = pick_device(SelectionPolicy::Auto, &devices).unwrap();
            assert_eq!(picked.id, "1", "label {:?} should match", label);
        }
    }

    #[test]
    fn test_sole_device_faces_user() {
        let devices = vec![device("0", "USB Cam")];
        let picked = pick_device(SelectionPolicy::Auto, &devices).unwrap();
        assert_eq!(picked.label, "USB Cam");
        assert_eq!(facing_hint(picked), FacingMode::User);
    }

    #[test]
    fn test_manual_defaults_to_first() {
        let devices = vec![device("0", "Front"), device("1", "Back Camera")];
        let picked = pick_device(SelectionPolicy::Manual, &devices).unwrap();
        assert_eq!(picked.label, "Front");
    }

    #[test]
    fn test_empty_list_picks_nothing() {
        assert!(pick_device(SelectionPolicy::Auto, &[]).is_none());
    }

    #[test]
    fn test_location_hint_counts_as_back_facing() {
        let mut dev = device("0", "Sensor A");
        dev.location = Some(CameraLocation::Back);
        assert!(is_back_facing(&dev));
        assert_eq!(facing_hint(&dev), FacingMode::Environment);
    }
}
