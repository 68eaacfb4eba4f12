//! Signing-path authorization.

use vellum_core::path::DerivationPath;

use crate::config::DeviceConfig;
use crate::error::DeviceError;

/// Normalize a requested signing path and check it against the policy.
///
/// Returns the canonical path on success.
///
/// # Errors
///
/// - [`DeviceError::Config`] if the configuration is out of range
/// - [`DeviceError::Core`] if the path or a configured pattern does not
///   normalize
/// - [`DeviceError::PathNotAllowed`] if no pattern admits the path
pub fn authorize_path(
    config: &DeviceConfig,
    raw_path: &str,
) -> Result<DerivationPath, DeviceError> {
    config.validate()?;
    let path = DerivationPath::parse(raw_path, config.max_path_depth)?;
    let policy = config.policy()?;

    if !policy.allows(&path) {
        tracing::warn!(%path, "signing path outside allowed set");
        return Err(DeviceError::PathNotAllowed(path.to_string()));
    }
    tracing::debug!(%path, "signing path authorized");
    Ok(path)
}
