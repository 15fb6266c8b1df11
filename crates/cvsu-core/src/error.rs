//! Error types for cvsu-core
//!
//! Provides a unified error type for all operations in the core crate.
//! Each variant captures enough context for diagnostics without exposing
//! internal implementation details.

use thiserror::Error;

/// cvsu-rs error type
#[derive(Error, Debug)]
pub enum Error {
    /// Element type mismatch between images or annotations
    #[error("type mismatch: expected {expected}, got {actual}")]
    BadType {
        expected: &'static str,
        actual: &'static str,
    },

    /// Shape mismatch or out-of-range rectangle
    #[error("bad size: {0}")]
    BadSize(String),

    /// Numeric precondition violated
    #[error("bad parameter: {0}")]
    BadParam(String),

    /// Required annotation, neighbor or element absent
    #[error("not found: {0}")]
    NotFound(&'static str),

    /// Malformed file header or payload
    #[error("input error: {0}")]
    InputError(String),

    /// Operation not supported for this type or format combination
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Internal invariant breakage; callers should abort
    #[error("fatal: {0}")]
    Fatal(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for cvsu operations
pub type Result<T> = std::result::Result<T, Error>;
