//! `vellum-core`: codecs, derivation paths and the firmware gate.
//!
//! Pure logic with no filesystem access of its own. Every adapter works over
//! caller-supplied `Read`/`Write` handles, and the anti-rollback state is
//! injected through [`HighWaterStore`].

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod codec;
pub mod error;
pub mod fingerprint;
pub mod firmware;
pub mod path;

pub use codec::{
    Base64Stream, Base64Writer, DecodeStream, Encoding, HexReader, HexStream, HexWriter,
    TextEncoding, CHUNK_GROUPS,
};
pub use error::CoreError;
pub use fingerprint::{swab32, Fingerprint};
pub use firmware::{
    FirmwareGate, FirmwareHeader, HardwareIdentity, HardwareVariant, HighWaterStore,
    MemoryHighWater, Rejection, Verdict,
};
pub use path::{
    cleanup, keypath_to_string, match_path, string_to_keypath, DerivationPath, PathComponent,
    PathOptions, PathPattern, PathPolicy,
};
