//! Error types for cvsu-segment

use thiserror::Error;

/// Errors that can occur during segmentation
#[derive(Debug, Error)]
pub enum SegmentError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] cvsu_core::Error),

    /// Forest error
    #[error("forest error: {0}")]
    Forest(#[from] cvsu_forest::ForestError),

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for segmentation operations
pub type SegmentResult<T> = Result<T, SegmentError>;
