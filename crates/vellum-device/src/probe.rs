//! Firmware-file probing.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use vellum_core::firmware::{
    FirmwareGate, FirmwareHeader, HardwareIdentity, HighWaterStore, Rejection, Verdict,
    FW_HEADER_SIZE,
};

use crate::error::DeviceError;

/// Check whether the file at `path` is firmware this device would take.
///
/// Reads only the header. Files without the firmware magic come back as
/// [`Verdict::NotFirmware`] rather than a rejection, so this can be run
/// over every file on removable media. The file's real length is checked
/// against the size the header declares.
///
/// # Errors
///
/// Returns [`DeviceError::Io`] if the file cannot be opened or read. A bad
/// header is never an error; it is reported in the verdict.
pub fn probe_firmware_file<H, S>(
    path: &Path,
    gate: &FirmwareGate<H, S>,
) -> Result<Verdict, DeviceError>
where
    H: HardwareIdentity,
    S: HighWaterStore,
{
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();

    let mut header = Vec::with_capacity(FW_HEADER_SIZE);
    file.take(FW_HEADER_SIZE as u64).read_to_end(&mut header)?;

    tracing::debug!(path = %path.display(), file_len, "probing firmware file");

    let Ok(expected_size) = u32::try_from(file_len) else {
        // Declared image sizes stop at u32::MAX, so no header can match.
        let is_firmware = FirmwareHeader::parse(&header).is_some_and(|h| h.has_valid_magic());
        if !is_firmware {
            return Ok(gate.validate(&header, None, true));
        }
        tracing::warn!(path = %path.display(), file_len, "firmware file larger than any image");
        return Ok(Verdict::Rejected(Rejection::Malformed("truncated")));
    };
    Ok(gate.validate(&header, Some(expected_size), true))
}
