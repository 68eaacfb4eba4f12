//! Fixed binary layout of the firmware image header.
//!
//! # Layout
//!
//! All integers little-endian.
//!
//! ```text
//! off  len  field
//!   0    4  magic            (FW_HEADER_MAGIC)
//!   4    4  timestamp        build marker, monotonic across releases
//!   8    8  version          ASCII, NUL padded
//!  16   64  public key       signing key of the image
//!  80    4  image size       declared length of the whole image file
//!  84    4  install flags
//!  88    4  hardware compat  one bit per variant; 0 = all variants
//!  92   36  reserved
//! ```
//!
//! Build tooling produces exactly this layout; [`FirmwareHeader::to_bytes`]
//! is the reference encoder.

use serde::{Deserialize, Serialize};

/// Total header length in bytes.
pub const FW_HEADER_SIZE: usize = 128;

/// Expected value of the magic field.
pub const FW_HEADER_MAGIC: u32 = 0xCC00_1234;

/// Length of the version string field.
pub const VERSION_LEN: usize = 8;

/// Length of the public key field.
pub const PUBKEY_LEN: usize = 64;

const MAGIC_OFFSET: usize = 0;
const TIMESTAMP_OFFSET: usize = 4;
const VERSION_OFFSET: usize = 8;
const PUBKEY_OFFSET: usize = VERSION_OFFSET + VERSION_LEN;
const IMAGE_SIZE_OFFSET: usize = PUBKEY_OFFSET + PUBKEY_LEN;
const INSTALL_FLAGS_OFFSET: usize = IMAGE_SIZE_OFFSET + 4;
const HW_COMPAT_OFFSET: usize = INSTALL_FLAGS_OFFSET + 4;
const RESERVED_OFFSET: usize = HW_COMPAT_OFFSET + 4;

// ---------------------------------------------------------------------------
// Hardware variants
// ---------------------------------------------------------------------------

/// Hardware revisions a firmware image can declare support for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareVariant {
    /// First production board.
    Rev1,
    /// Second board, new secure element.
    Rev2,
    /// Current board.
    Rev3,
}

impl HardwareVariant {
    /// Bit in the header's hardware-compat mask for this variant.
    #[must_use]
    pub const fn compat_bit(self) -> u32 {
        match self {
            Self::Rev1 => 0x01,
            Self::Rev2 => 0x02,
            Self::Rev3 => 0x04,
        }
    }

    /// Short label shown to the user.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rev1 => "rev1",
            Self::Rev2 => "rev2",
            Self::Rev3 => "rev3",
        }
    }

    /// Every known variant.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Rev1, Self::Rev2, Self::Rev3]
    }
}

impl std::fmt::Display for HardwareVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Source of the running board's hardware variant.
pub trait HardwareIdentity {
    /// The variant this device is.
    fn variant(&self) -> HardwareVariant;
}

impl HardwareIdentity for HardwareVariant {
    fn variant(&self) -> HardwareVariant {
        *self
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Decoded firmware image header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirmwareHeader {
    /// Magic field as read; equals [`FW_HEADER_MAGIC`] for firmware.
    pub magic: u32,
    /// Build timestamp.
    pub timestamp: u32,
    /// NUL-padded version text.
    pub version: [u8; VERSION_LEN],
    /// Image signing key.
    pub public_key: [u8; PUBKEY_LEN],
    /// Declared length of the image file.
    pub image_size: u32,
    /// Install-time flag bits.
    pub install_flags: u32,
    /// Supported variants; zero means all.
    pub hw_compat: u32,
}

impl FirmwareHeader {
    /// Decode the leading [`FW_HEADER_SIZE`] bytes of `data`.
    ///
    /// Returns `None` if `data` is shorter than a header. Field values are
    /// not checked here.
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        let data = data.get(..FW_HEADER_SIZE)?;
        Some(Self {
            magic: read_u32_le(data, MAGIC_OFFSET)?,
            timestamp: read_u32_le(data, TIMESTAMP_OFFSET)?,
            version: data
                .get(VERSION_OFFSET..PUBKEY_OFFSET)?
                .try_into()
                .ok()?,
            public_key: data
                .get(PUBKEY_OFFSET..IMAGE_SIZE_OFFSET)?
                .try_into()
                .ok()?,
            image_size: read_u32_le(data, IMAGE_SIZE_OFFSET)?,
            install_flags: read_u32_le(data, INSTALL_FLAGS_OFFSET)?,
            hw_compat: read_u32_le(data, HW_COMPAT_OFFSET)?,
        })
    }

    /// Encode into the fixed layout, reserved bytes zeroed.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; FW_HEADER_SIZE] {
        let mut out = [0u8; FW_HEADER_SIZE];
        out[MAGIC_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&self.magic.to_le_bytes());
        out[TIMESTAMP_OFFSET..VERSION_OFFSET].copy_from_slice(&self.timestamp.to_le_bytes());
        out[VERSION_OFFSET..PUBKEY_OFFSET].copy_from_slice(&self.version);
        out[PUBKEY_OFFSET..IMAGE_SIZE_OFFSET].copy_from_slice(&self.public_key);
        out[IMAGE_SIZE_OFFSET..INSTALL_FLAGS_OFFSET]
            .copy_from_slice(&self.image_size.to_le_bytes());
        out[INSTALL_FLAGS_OFFSET..HW_COMPAT_OFFSET]
            .copy_from_slice(&self.install_flags.to_le_bytes());
        out[HW_COMPAT_OFFSET..RESERVED_OFFSET].copy_from_slice(&self.hw_compat.to_le_bytes());
        out
    }

    /// Version text with NUL padding removed.
    #[must_use]
    pub fn version_str(&self) -> String {
        let end = self
            .version
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(VERSION_LEN);
        String::from_utf8_lossy(&self.version[..end]).into_owned()
    }

    /// Whether the magic field marks this as firmware.
    #[must_use]
    pub const fn has_valid_magic(&self) -> bool {
        self.magic == FW_HEADER_MAGIC
    }

    /// Whether the image declares support for `variant`.
    #[must_use]
    pub const fn supports(&self, variant: HardwareVariant) -> bool {
        self.hw_compat == 0 || self.hw_compat & variant.compat_bit() != 0
    }
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes: [u8; 4] = data.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}
