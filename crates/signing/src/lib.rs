mod board;
mod checker;
pub mod error;
mod manifest;
pub mod remote;
mod tsschecker;

pub use crate::board::{DEFAULT_DEVICE_API_URL, DeviceApi};
pub use crate::checker::{SigningChecker, SigningOptions, check_records};
pub use crate::manifest::{MANIFEST_MARKER, fetch_manifest};
pub use crate::tsschecker::{DEFAULT_EXECUTABLE, SIGNED_MARKER, SigningOracle, Tsschecker, reports_signed};
