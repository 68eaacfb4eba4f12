//! Device error types for `vellum-device`.

use thiserror::Error;
use vellum_core::CoreError;

/// Errors produced by device-side operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Codec, path or header failure (delegated from core).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Device configuration is unusable.
    #[error("config error: {0}")]
    Config(String),

    /// High-water store is unreadable or could not be updated.
    #[error("high-water store error: {0}")]
    Store(String),

    /// A signing path is well formed but outside the allowed set.
    #[error("path not allowed: {0}")]
    PathNotAllowed(String),
}
