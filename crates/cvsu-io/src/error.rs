//! I/O error types

use thiserror::Error;

/// I/O error type
#[derive(Error, Debug)]
pub enum IoError {
    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File magic of a format this library does not read
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Malformed file header or payload
    #[error("input error: {0}")]
    InputError(String),

    /// Image cannot be represented in the requested format
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] cvsu_core::Error),
}

/// Result type for I/O operations
pub type IoResult<T> = Result<T, IoError>;
