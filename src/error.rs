//! Runner Error Types
//!
//! Failures that stop the whole run. Anything scoped to a single page or
//! device is logged and skipped instead of ending up here.

use derive_more::{Display, Error};

/// A fatal runner error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for runner operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("{_0} is not supported")]
    UnsupportedPlatform(#[error(not(source))] &'static str),
    #[display("configuration could not be loaded")]
    Config,
    #[display("signing checks are unavailable")]
    Signing,
    /// Not a single family group could be searched.
    #[display("could not reach the wiki")]
    Scrape,
    #[display("failed to write output to {_0}")]
    Write(#[error(not(source))] String),
    /// A scrape or signing task panicked or was cancelled.
    #[display("background task failed")]
    Task,
}
