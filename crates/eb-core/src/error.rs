//! Error types for evboot

use std::path::PathBuf;

use thiserror::Error;

/// evboot error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// FITS table could not be read or written
    #[error("FITS error: {0}")]
    Fits(#[from] eb_fits::FitsError),

    /// Batch manifest is missing or unreadable
    #[error("manifest {} not readable: {source}", .path.display())]
    ManifestUnreadable {
        /// Manifest path as given.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
