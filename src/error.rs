use std::io;

use thiserror::Error;

/// Unified error type for the storage engine.
///
/// A missing key is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error from disk operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Malformed WAL or table record (bad length, truncated record, CRC mismatch).
    #[error("Corruption: {0}")]
    Corruption(String),
    /// Rejected before any durable write was attempted.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The engine has been closed.
    #[error("Engine is closed")]
    Closed,
}

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;
