//! Error types for cvsu-integral

use thiserror::Error;

/// Errors that can occur in integral image operations
#[derive(Debug, Error)]
pub enum IntegralError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] cvsu_core::Error),

    /// Unsupported element type for this operation
    #[error("unsupported type: expected {expected}, got {actual}")]
    UnsupportedType {
        expected: &'static str,
        actual: &'static str,
    },

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Source and integral image shapes disagree
    #[error("shape mismatch: integral is {expected_width}x{expected_height}, source is {actual_width}x{actual_height}")]
    ShapeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

/// Result type for integral image operations
pub type IntegralResult<T> = Result<T, IntegralError>;
