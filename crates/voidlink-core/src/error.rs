//! Error types for Voidlink core.

use thiserror::Error;

/// Core error type for report decoding and command encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Malformed report: expected {expected} bytes, got {actual}")]
    MalformedReport { expected: usize, actual: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown battery status code: {0}")]
    UnknownStatusCode(u8),
}

/// Result type alias for Voidlink core operations.
pub type Result<T> = std::result::Result<T, Error>;
