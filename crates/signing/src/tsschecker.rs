use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use exn::ResultExt;
use tokio::process::Command;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

pub const DEFAULT_EXECUTABLE: &str = "tsschecker";
/// Printed by tsschecker when the signing server accepts the build.
pub const SIGNED_MARKER: &str = "IS being signed!";

/// Answers whether a firmware build is currently being signed for a device.
#[async_trait]
pub trait SigningOracle: Send + Sync {
    async fn is_signed(&self, device: &str, board: &str, manifest: &Path) -> Result<bool>;
}

/// Asks Apple's signing server through the `tsschecker` binary.
#[derive(Debug, Clone)]
pub struct Tsschecker {
    path: PathBuf,
}
impl Tsschecker {
    /// Finds the executable on `PATH` (or at `name`, if it's a path).
    pub fn discover(name: impl AsRef<OsStr>) -> Result<Self> {
        let name = name.as_ref();
        match which::which(name) {
            Ok(path) => {
                tracing::trace!(path = %path.display(), "Discovered tsschecker");
                Ok(Self { path })
            },
            Err(_) => exn::bail!(ErrorKind::ToolNotFound(name.to_string_lossy().into_owned())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SigningOracle for Tsschecker {
    #[instrument(skip(self, manifest), fields(signed))]
    async fn is_signed(&self, device: &str, board: &str, manifest: &Path) -> Result<bool> {
        let output = Command::new(&self.path)
            .arg("-d")
            .arg(device)
            .arg("-B")
            .arg(board)
            .arg("-m")
            .arg(manifest)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .or_raise(|| ErrorKind::ToolFailed(self.path.display().to_string()))?;
        // tsschecker's exit code says nothing reliable about signing status.
        let signed = reports_signed(&String::from_utf8_lossy(&output.stdout));
        tracing::Span::current().record("signed", signed);
        tracing::trace!(status = %output.status, "tsschecker finished");
        Ok(signed)
    }
}

pub fn reports_signed(stdout: &str) -> bool {
    stdout.contains(SIGNED_MARKER)
}
