// SPDX-License-Identifier: GPL-3.0-only

//! User configuration handling
//!
//! Persisted as JSON under the user's config directory. Missing or
//! unreadable files fall back to defaults so a broken config never
//! blocks a scan; unknown fields are ignored for forward compatibility.

use crate::constants::{
    DEFAULT_CANCEL_KEY, DEFAULT_CONFIRM_HOLD_MS, DEFAULT_ROW_STEP,
};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera device index (the N in /dev/videoN)
    pub device_index: usize,
    /// Key that cancels an interactive scan
    pub cancel_key: char,
    /// How long the confirmation frame stays visible, in milliseconds
    pub confirm_hold_ms: u64,
    /// Vertical step between scanned rows per decode attempt
    pub row_step: u32,
    /// Save the confirmation frame as a snapshot after a successful scan
    pub save_frames: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_index: 0,
            cancel_key: DEFAULT_CANCEL_KEY,
            confirm_hold_ms: DEFAULT_CONFIRM_HOLD_MS,
            row_step: DEFAULT_ROW_STEP,
            save_frames: false,
        }
    }
}

impl Config {
    /// Path of the config file, if a config directory exists
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bookscan").join("config.json"))
    }

    /// Load the configuration, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Config unreadable, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist the configuration
    pub fn save(&self) -> AppResult<()> {
        let path = Self::path().ok_or_else(|| {
            AppError::Config("no config directory available".to_string())
        })?;
        self.save_to(&path)
    }

    fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Confirmation hold as a duration
    pub fn confirm_hold(&self) -> Duration {
        Duration::from_millis(self.confirm_hold_ms)
    }
}
