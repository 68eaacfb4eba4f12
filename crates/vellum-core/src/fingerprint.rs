//! Master-key fingerprint and its text form.
//!
//! A fingerprint is four bytes, not really an integer. It is carried as a
//! `u32` in keypath words but shown as the little-endian bytes in uppercase
//! hex, so `0x0F056943` renders as `4369050F`. Export formats produced
//! elsewhere depend on this byte order.

use std::fmt;
use std::str::FromStr;

use data_encoding::{HEXLOWER_PERMISSIVE, HEXUPPER};

use crate::error::CoreError;

/// Four-byte key fingerprint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Fingerprint(u32);

impl Fingerprint {
    /// Wrap a fingerprint word.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// The fingerprint word as carried in keypaths.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// The four fingerprint bytes in display order.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&HEXUPPER.encode(&self.to_bytes()))
    }
}

impl FromStr for Fingerprint {
    type Err = CoreError;

    /// Parse eight hex characters, either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = HEXLOWER_PERMISSIVE
            .decode(s.as_bytes())
            .map_err(|e| CoreError::Format(format!("invalid fingerprint {s:?}: {e}")))?;
        let bytes: [u8; 4] = bytes.try_into().map_err(|_| {
            CoreError::Format(format!("fingerprint {s:?} must be 8 hex characters"))
        })?;
        Ok(Self(u32::from_le_bytes(bytes)))
    }
}

/// Reverse the byte order of a 32-bit word.
#[must_use]
pub const fn swab32(n: u32) -> u32 {
    n.swap_bytes()
}
