//! Writing a [`DeviceTable`] out as one JSON file per device.

use std::path::{Path, PathBuf};

use betas_extract::models::{DeviceTable, FirmwareRecord};
use exn::ResultExt;
use tokio::fs;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_device;

/// Replaces `root` with a fresh directory holding one file per device.
///
/// Each file is named after the device identifier (no extension) and holds a
/// JSON array of that device's records, newest build first. Every device name
/// is validated before anything on disk is touched. Returns the number of
/// files written.
#[instrument(skip(root, table), fields(root = %root.as_ref().display(), devices = table.len()))]
pub async fn write_table(root: impl AsRef<Path>, table: &DeviceTable) -> Result<usize> {
    let root = root.as_ref();
    let files = table
        .devices()
        .map(|device| validate_device(device).map(|name| (device, root.join(name))))
        .collect::<Result<Vec<(&str, PathBuf)>>>()?;

    reset_directory(root).await?;
    for (device, path) in &files {
        let records = table.sorted_records(device);
        let json = serde_json::to_vec(&records).or_raise(|| ErrorKind::InvalidData(path.clone()))?;
        fs::write(path, json).await.map_err(|e| ErrorKind::from_io(e, path))?;
        tracing::trace!(device, records = records.len(), "Device file written");
    }
    Ok(files.len())
}

/// Reads back the records written for one device.
#[instrument(skip(root))]
pub async fn read_device(root: impl AsRef<Path>, device: &str) -> Result<Vec<FirmwareRecord>> {
    let path = root.as_ref().join(validate_device(device)?);
    let json = fs::read(&path).await.map_err(|e| ErrorKind::from_io(e, &path))?;
    serde_json::from_slice(&json).or_raise(|| ErrorKind::InvalidData(path))
}

async fn reset_directory(root: &Path) -> Result<()> {
    match fs::remove_dir_all(root).await {
        Ok(()) => tracing::debug!(root = %root.display(), "Removed previous output"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
        Err(err) => exn::bail!(ErrorKind::from_io(err, root)),
    }
    Ok(fs::create_dir_all(root).await.map_err(|e| ErrorKind::from_io(e, root))?)
}
