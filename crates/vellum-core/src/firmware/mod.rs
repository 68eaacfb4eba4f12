//! Firmware header gate.
//!
//! This module provides:
//! - [`FirmwareGate`]: checks a candidate image header before it is trusted
//! - [`Verdict`] / [`Rejection`]: the always-answer result of that check
//! - [`FirmwareHeader`]: the fixed header layout
//! - [`HighWaterStore`]: injected anti-rollback state
//!
//! # Checks, in order
//!
//! 1. At least [`FW_HEADER_SIZE`] bytes.
//! 2. Magic matches, unless probing non-firmware files is tolerated.
//! 3. Declared image size equals the actual size, when known.
//! 4. The hardware-compat mask admits the running variant.
//! 5. The build timestamp is not older than the variant's high-water mark.
//!
//! The gate never returns an error. Every outcome is a [`Verdict`], and a
//! rejection's `Display` text is meant to be shown to the user as is. These
//! are basic checks for a confused user holding the wrong file, not a
//! defence against a hostile image: signature verification happens later,
//! in the commit flow.

mod header;
mod store;

pub use header::{
    FirmwareHeader, HardwareIdentity, HardwareVariant, FW_HEADER_MAGIC, FW_HEADER_SIZE,
    PUBKEY_LEN, VERSION_LEN,
};
pub use store::{HighWaterStore, MemoryHighWater};

use std::fmt;

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Why a header was turned away.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// Shorter than a header, bad magic, or size mismatch.
    Malformed(&'static str),
    /// The image does not list the running hardware variant.
    IncompatibleHardware(HardwareVariant),
    /// The image is older than the newest one ever accepted.
    Downgrade {
        /// Timestamp in the offered header.
        offered: u32,
        /// Current high-water mark.
        high_water: u32,
    },
    /// The anti-rollback store could not be read.
    HighWaterUnavailable,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(reason) => write!(
                f,
                "That does not look like a firmware file we would want to use: {reason}"
            ),
            Self::IncompatibleHardware(variant) => write!(
                f,
                "New firmware doesn't support this version of the hardware ({variant})."
            ),
            Self::Downgrade { .. } => f.write_str("That downgrade is not supported."),
            Self::HighWaterUnavailable => {
                f.write_str("Unable to check for downgrades right now. Firmware not accepted.")
            }
        }
    }
}

/// Outcome of [`FirmwareGate::validate`].
#[must_use = "a firmware verdict must be checked before the image is used"]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Header passed every check.
    Accepted(FirmwareHeader),
    /// Magic did not match and non-firmware input was tolerated.
    NotFirmware,
    /// Header failed a check.
    Rejected(Rejection),
}

impl Verdict {
    /// Whether the header passed.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// The rejection, if any.
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(r) => Some(r),
            Self::Accepted(_) | Self::NotFirmware => None,
        }
    }

    /// Text to show the user, or `None` when there is nothing to complain
    /// about (accepted, or not firmware at all).
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.rejection().map(ToString::to_string)
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Validates firmware headers for one device.
///
/// Both collaborators are injected: `hardware` names the running variant,
/// `store` answers high-water queries. The store is consulted afresh on
/// every call.
#[derive(Clone, Debug)]
pub struct FirmwareGate<H, S> {
    hardware: H,
    store: S,
}

impl<H: HardwareIdentity, S: HighWaterStore> FirmwareGate<H, S> {
    /// Build a gate.
    pub const fn new(hardware: H, store: S) -> Self {
        Self { hardware, store }
    }

    /// Check `header` (the leading bytes of an image file).
    ///
    /// - `expected_size`: actual length of the image, if known
    /// - `tolerate_non_firmware`: answer [`Verdict::NotFirmware`] rather
    ///   than rejecting when the magic does not match; used when probing
    ///   arbitrary files
    pub fn validate(
        &self,
        header: &[u8],
        expected_size: Option<u32>,
        tolerate_non_firmware: bool,
    ) -> Verdict {
        let verdict = self.check(header, expected_size, tolerate_non_firmware);
        match &verdict {
            Verdict::Accepted(h) => tracing::info!(
                timestamp = h.timestamp,
                version = %h.version_str(),
                "firmware header accepted"
            ),
            Verdict::NotFirmware => tracing::debug!("probed file is not firmware"),
            Verdict::Rejected(r) => tracing::warn!(reason = ?r, "firmware header rejected"),
        }
        verdict
    }

    fn check(&self, header: &[u8], expected_size: Option<u32>, tolerate: bool) -> Verdict {
        let Some(parsed) = FirmwareHeader::parse(header) else {
            return Verdict::Rejected(Rejection::Malformed("too short"));
        };

        if !parsed.has_valid_magic() {
            if tolerate {
                return Verdict::NotFirmware;
            }
            return Verdict::Rejected(Rejection::Malformed("bad magic"));
        }

        if expected_size.is_some_and(|size| size != parsed.image_size) {
            return Verdict::Rejected(Rejection::Malformed("truncated"));
        }

        let variant = self.hardware.variant();
        if !parsed.supports(variant) {
            return Verdict::Rejected(Rejection::IncompatibleHardware(variant));
        }

        match self.store.high_water(variant) {
            Ok(Some(mark)) if parsed.timestamp < mark => {
                return Verdict::Rejected(Rejection::Downgrade {
                    offered: parsed.timestamp,
                    high_water: mark,
                });
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(%variant, "high-water store unreadable: {e}");
                return Verdict::Rejected(Rejection::HighWaterUnavailable);
            }
        }

        Verdict::Accepted(parsed)
    }
}
