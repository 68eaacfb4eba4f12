//! `vellum-device`: device-side glue around `vellum-core`.
//!
//! Owns everything that touches the filesystem: the persisted device
//! configuration, the file-backed high-water store, export and import
//! sessions over the streaming codecs, firmware-file probing, and the
//! signing-path authorization step.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod authorize;
pub mod config;
pub mod error;
pub mod highwater;
pub mod probe;
pub mod session;

mod atomic;

pub use authorize::authorize_path;
pub use config::DeviceConfig;
pub use error::DeviceError;
pub use highwater::FileHighWater;
pub use probe::probe_firmware_file;
pub use session::{export_file, import_file, import_into, ExportReceipt};
