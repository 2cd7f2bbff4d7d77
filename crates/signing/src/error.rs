//! Signing Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A signing check error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for signing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The device API doesn't know a board config for this device.
    #[display("no board config found for device: {_0}")]
    BoardNotFound(#[error(not(source))] String),
    /// Connection, timeout, or an unexpected HTTP response.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// A configured URL, or a firmware download URL, can't be parsed.
    #[display("invalid URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    /// The remote file isn't a ZIP archive we can read.
    #[display("invalid archive: {_0}")]
    InvalidArchive(#[error(not(source))] String),
    /// The archive is readable but uses a feature this reader lacks, like an
    /// unknown compression method or encryption.
    #[display("unsupported archive: {_0}")]
    UnsupportedArchive(#[error(not(source))] String),
    /// The archive has no build manifest entry.
    #[display("no build manifest in archive")]
    ManifestNotFound,
    /// The signing check tool isn't installed.
    #[display("{_0} not detected on your system")]
    ToolNotFound(#[error(not(source))] String),
    /// The signing check tool couldn't be run.
    #[display("failed to run {_0}")]
    ToolFailed(#[error(not(source))] String),
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Io)
    }
}
