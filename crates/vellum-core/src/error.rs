//! Error types for `vellum-core`.

use thiserror::Error;

/// Errors produced by the codec streams and the derivation-path policy.
///
/// Firmware header checks never produce this type; they answer with a
/// [`crate::firmware::Verdict`] instead.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed encoded byte stream (odd-length hex, bad Base64 alphabet).
    #[error("format error: {0}")]
    Format(String),

    /// Derivation path syntax, range, or depth violation.
    #[error("invalid derivation path: {0}")]
    Validation(String),

    /// Operation a stream adapter does not support (relative or end seeks).
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The wrapped sink or source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CoreError> for std::io::Error {
    fn from(err: CoreError) -> Self {
        use std::io::ErrorKind;
        match err {
            CoreError::Io(inner) => inner,
            CoreError::UnsupportedOperation(_) => Self::new(ErrorKind::Unsupported, err),
            CoreError::Format(_) | CoreError::Validation(_) => {
                Self::new(ErrorKind::InvalidData, err)
            }
        }
    }
}
