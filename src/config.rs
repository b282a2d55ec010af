// SPDX-License-Identifier: GPL-3.0-only

//! User configuration handling
//!
//! Stored as JSON under the platform config directory. Load failures fall
//! back to defaults so a corrupt file never prevents startup.

use crate::backends::camera::types::CameraBackendType;
use crate::constants::{APP_NAME, CONFIG_FILE};
use crate::errors::{ScanError, ScanResult};
use crate::scanner::SelectionPolicy;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera backend to use
    pub backend: CameraBackendType,
    /// How a device is chosen when the user has not picked one
    pub selection_policy: SelectionPolicy,
    /// Last used camera device id
    pub last_device: Option<String>,
    /// Render the live preview in the terminal UI
    pub preview_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            selection_policy: SelectionPolicy::default(),
            last_device: None,
            preview_enabled: true,
        }
    }
}

impl Config {
    /// Load the config, falling back to defaults when missing or corrupt
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist the config
    pub fn save(&self) -> ScanResult<()> {
        let path = Self::path()
            .ok_or_else(|| ScanError::Config("no config directory on this platform".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ScanError::Config(format!("creating {}: {}", parent.display(), e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ScanError::Config(e.to_string()))?;
        std::fs::write(&path, contents)
            .map_err(|e| ScanError::Config(format!("writing {}: {}", path.display(), e)))?;

        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }
}
