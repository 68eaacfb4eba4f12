//! Atomic JSON writes for small state files.

use std::fs;
use std::path::Path;

/// Write `json` to `{dir}/{name}` through `{dir}/.{name}.tmp` and a rename,
/// so a crash leaves either the old file or the new one.
pub(crate) fn write_json(dir: &Path, name: &str, json: &str) -> std::io::Result<()> {
    let path = dir.join(name);
    let tmp = dir.join(format!(".{name}.tmp"));

    fs::write(&tmp, json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
    }

    fs::rename(&tmp, &path)
}
