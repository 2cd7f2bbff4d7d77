//! Path validation for device files.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a device identifier for use as a single file name.
///
/// Device files live directly in the output directory, so the name must be
/// exactly one normal path component: no separators (either kind), no `.` or
/// `..`, and no null bytes.
///
/// # Examples
///
/// ```
/// use betas_storage::validate_device;
/// assert!(validate_device("iPhone12,1").is_ok());
/// assert!(validate_device("AppleTV5,3").is_ok());
/// assert!(validate_device("../etc/passwd").is_err());
/// assert!(validate_device("iPad/Pro").is_err());
/// ```
pub fn validate(device: &str) -> Result<PathBuf> {
    let invalid = || ErrorKind::InvalidPath(PathBuf::from(device));
    // Backslashes are ordinary characters on Unix; reject them anyway so the
    // output directory means the same thing everywhere.
    if device.contains(['\0', '\\']) {
        exn::bail!(invalid());
    }
    let mut components = Path::new(device).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Ok(PathBuf::from(name)),
        _ => exn::bail!(invalid()),
    }
}
