//! Wiki Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A wiki client error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for wiki operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The wiki has no page with this title.
    #[display("page not found: {_0}")]
    PageNotFound(#[error(not(source))] String),
    /// The API answered, but with an error payload.
    #[display("wiki API error [{code}]: {info}")]
    Api {
        /// Machine-readable MediaWiki error code.
        code: String,
        /// Human-readable description from the wiki.
        info: String,
    },
    /// Connection, timeout, or an HTTP status worth trying again.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The response body wasn't the shape we expected.
    #[display("invalid response: {_0}")]
    InvalidResponse(#[error(not(source))] String),
    /// The configured API endpoint isn't a URL.
    #[display("invalid endpoint: {_0}")]
    InvalidEndpoint(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
