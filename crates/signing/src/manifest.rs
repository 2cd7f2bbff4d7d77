use std::path::{Path, PathBuf};

use exn::{OptionExt, ResultExt};
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::remote::{RangeSource, RemoteZip};

/// Build manifests are the first archive entry with this in their name
/// (`BuildManifest.plist` in every IPSW so far).
pub const MANIFEST_MARKER: &str = "Manifest";

/// Pulls the build manifest out of a remote IPSW into `directory`, returning
/// the path of the written file.
#[instrument(skip(source, directory), fields(entry, size))]
pub async fn fetch_manifest<S: RangeSource + Clone + 'static>(source: S, directory: &Path) -> Result<PathBuf> {
    let archive = RemoteZip::open(source).await?;
    let entry = archive.find(|name| name.contains(MANIFEST_MARKER)).ok_or_raise(|| ErrorKind::ManifestNotFound)?;
    let data = archive.read(entry).await?;

    let file_name = Path::new(entry)
        .file_name()
        .ok_or_raise(|| ErrorKind::InvalidArchive(format!("entry has no file name: {entry}")))?;
    let path = directory.join(file_name);
    tokio::fs::write(&path, &data).await.or_raise(|| ErrorKind::Io)?;

    let span = tracing::Span::current();
    span.record("entry", entry);
    span.record("size", data.len());
    Ok(path)
}
