//! Internal error types for machinist-reqwest.

use thiserror::Error;

/// Result type alias for machinist-reqwest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for machinist-reqwest operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Response body is not a valid extension map.
    #[error("Decode error: {0}")]
    Decode(#[from] machinist_core::Error),
}

impl Error {
    /// Returns true if the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Reqwest(e) if e.is_timeout())
    }
}
