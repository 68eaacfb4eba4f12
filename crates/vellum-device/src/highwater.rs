//! File-backed anti-rollback store.
//!
//! Marks live in `{data_dir}/highwater.json` as a map from variant label
//! to timestamp. The file is read on every query so a commit made through
//! another handle is seen immediately. Marks only ever move forward.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use vellum_core::firmware::{HardwareVariant, HighWaterStore};
use vellum_core::CoreError;

use crate::atomic;
use crate::error::DeviceError;

const HIGHWATER_FILE: &str = "highwater.json";

type Marks = BTreeMap<String, u32>;

/// High-water marks persisted under a data directory.
#[derive(Clone, Debug)]
pub struct FileHighWater {
    data_dir: PathBuf,
}

impl FileHighWater {
    /// Use `{data_dir}/highwater.json`. Nothing is read until queried.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(HIGHWATER_FILE)
    }

    /// Record that firmware built at `timestamp` was accepted on `variant`.
    ///
    /// The stored mark is raised to `timestamp` if that is newer and left
    /// alone otherwise. Returns the mark now in effect.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Store`] if the existing file is corrupt (it is
    /// never overwritten in that case) and [`DeviceError::Io`] if it cannot
    /// be read or replaced.
    pub fn advance(&self, variant: HardwareVariant, timestamp: u32) -> Result<u32, DeviceError> {
        let mut marks = read_marks(&self.path()).map_err(|e| match e {
            CoreError::Io(io) => DeviceError::Io(io),
            other => DeviceError::Store(other.to_string()),
        })?;

        if let Some(&mark) = marks.get(variant.label()) {
            if mark >= timestamp {
                tracing::debug!(%variant, mark, timestamp, "high-water mark unchanged");
                return Ok(mark);
            }
        }
        marks.insert(variant.label().to_string(), timestamp);

        let json = serde_json::to_string_pretty(&marks)
            .map_err(|e| DeviceError::Store(format!("cannot encode marks: {e}")))?;
        atomic::write_json(&self.data_dir, HIGHWATER_FILE, &json)?;

        tracing::info!(%variant, timestamp, "high-water mark advanced");
        Ok(timestamp)
    }
}

impl HighWaterStore for FileHighWater {
    fn high_water(&self, variant: HardwareVariant) -> Result<Option<u32>, CoreError> {
        let marks = read_marks(&self.path())?;
        Ok(marks.get(variant.label()).copied())
    }
}

/// Read the marks file. A missing file holds no marks.
fn read_marks(path: &Path) -> Result<Marks, CoreError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Marks::new()),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&contents)
        .map_err(|e| CoreError::Format(format!("corrupt high-water file: {e}")))
}
