//! Error types for cvsu-forest

use thiserror::Error;

/// Errors that can occur in quad forest operations
#[derive(Debug, Error)]
pub enum ForestError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] cvsu_core::Error),

    /// Integral image error
    #[error("integral error: {0}")]
    Integral(#[from] cvsu_integral::IntegralError),

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Source image format the forest cannot consume
    #[error("unsupported source format: {0}")]
    UnsupportedFormat(String),
}

/// Result type for forest operations
pub type ForestResult<T> = Result<T, ForestError>;
