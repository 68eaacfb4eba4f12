//! Chunked streaming codecs between binary payloads and hex/Base64 text.
//!
//! This module provides:
//! - [`HexWriter`]: binary in, lowercase hex out, with a running SHA-256
//!   over the decoded bytes
//! - [`HexReader`]: pulls `2n` hex characters from a source per `n` bytes
//! - [`Base64Writer`]: binary in, Base64 out, carrying a 0 to 2 byte runt
//!   between calls so every emitted run is whole 4-character groups
//! - [`DecodeStream`]: whitespace-tolerant text-to-binary decoding in a
//!   fixed window of [`CHUNK_GROUPS`] groups
//!
//! # Memory Bound
//!
//! Every adapter encodes or decodes through a fixed window: at most
//! [`CHUNK_GROUPS`] groups of text are held at once, independent of the
//! total stream length. The window is a constant, not a tunable.
//!
//! # Trailer
//!
//! Writers append [`TRAILER`] (`\r\n`) when their session closes, either via
//! an explicit `finish()` or, as a fallback, on drop.

mod base64;
mod decode;
mod hex;

pub use self::base64::Base64Writer;
pub use self::decode::{Base64, Base64Stream, DecodeStream, Decoded, Hex, HexStream, TextEncoding};
pub use self::hex::{HexReader, HexWriter};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of encoding groups held in one working window.
pub const CHUNK_GROUPS: usize = 128;

/// Marker appended to the sink when a writer session closes.
pub const TRAILER: &[u8] = b"\r\n";

/// Length of the SHA-256 checksum exposed by [`HexWriter::finish`].
pub const CHECKSUM_LEN: usize = 32;

/// Largest encoded window any adapter produces (128 Base64 groups).
const ENCODED_WINDOW: usize = CHUNK_GROUPS * 4;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Text representation used for an encoded payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Two hex characters per byte.
    #[default]
    Hex,
    /// Four Base64 characters per three bytes.
    Base64,
}

impl Encoding {
    /// Encoded characters per group.
    #[must_use]
    pub const fn group_size(self) -> usize {
        match self {
            Self::Hex => Hex::GROUP,
            Self::Base64 => Base64::GROUP,
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hex => f.write_str("hex"),
            Self::Base64 => f.write_str("base64"),
        }
    }
}
