//! Device configuration, stored as plain JSON next to the device state.
//!
//! Nothing here is secret. A missing or unreadable file falls back to the
//! defaults so the device always boots with a usable configuration.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vellum_core::firmware::{HardwareIdentity, HardwareVariant};
use vellum_core::path::{PathPolicy, ANY_PATH, MAX_PATH_DEPTH};
use vellum_core::{CoreError, Encoding};

use crate::atomic;
use crate::error::DeviceError;

const CONFIG_FILE: &str = "device.json";

/// Persistent device settings.
///
/// Persisted to `{data_dir}/device.json`. Missing fields take their
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    /// Board revision this device runs on.
    #[serde(default = "default_hardware_variant")]
    pub hardware_variant: HardwareVariant,

    /// Deepest derivation path accepted, at most [`MAX_PATH_DEPTH`].
    #[serde(default = "default_max_path_depth")]
    pub max_path_depth: usize,

    /// Signing path allow-list, as pattern text (`"any"`, exact paths, or
    /// paths ending in `*` / `*'`).
    #[serde(default = "default_allowed_paths")]
    pub allowed_paths: Vec<String>,

    /// Text encoding used for exported files.
    #[serde(default)]
    pub export_encoding: Encoding,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            hardware_variant: default_hardware_variant(),
            max_path_depth: default_max_path_depth(),
            allowed_paths: default_allowed_paths(),
            export_encoding: Encoding::default(),
        }
    }
}

const fn default_hardware_variant() -> HardwareVariant {
    HardwareVariant::Rev3
}
const fn default_max_path_depth() -> usize {
    MAX_PATH_DEPTH
}
fn default_allowed_paths() -> Vec<String> {
    vec![ANY_PATH.into()]
}

impl DeviceConfig {
    /// Load the configuration from `{data_dir}/device.json`.
    ///
    /// Returns [`Default::default()`] when the file is missing, cannot be
    /// read, or contains invalid JSON. Only a missing file goes unlogged.
    #[must_use]
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    "unreadable device config, using defaults: {e}"
                );
                return Self::default();
            }
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "corrupt device config, using defaults: {e}");
            Self::default()
        })
    }

    /// Persist the configuration to `{data_dir}/device.json`.
    ///
    /// Written atomically (`.tmp` then rename), owner-only on Unix.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the directory does not exist or the
    /// file system rejects the write or rename.
    pub fn save(&self, data_dir: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        atomic::write_json(data_dir, CONFIG_FILE, &json)
    }

    /// Check values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Config`] if `max_path_depth` is zero or above
    /// [`MAX_PATH_DEPTH`].
    pub fn validate(&self) -> Result<(), DeviceError> {
        if self.max_path_depth == 0 || self.max_path_depth > MAX_PATH_DEPTH {
            return Err(DeviceError::Config(format!(
                "maxPathDepth must be 1..={MAX_PATH_DEPTH}, got {}",
                self.max_path_depth
            )));
        }
        Ok(())
    }

    /// Parse [`allowed_paths`](Self::allowed_paths) into a policy.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for the first pattern that does
    /// not normalize.
    pub fn policy(&self) -> Result<PathPolicy, CoreError> {
        PathPolicy::parse(&self.allowed_paths, self.max_path_depth)
    }
}

impl HardwareIdentity for DeviceConfig {
    fn variant(&self) -> HardwareVariant {
        self.hardware_variant
    }
}
