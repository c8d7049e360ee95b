//! Error types for detout.

use thiserror::Error;

/// Result alias for detout operations.
pub type DetOutResult<T> = std::result::Result<T, DetOutError>;

/// Errors that can occur when configuring or running the decoder.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DetOutError {
    /// A configuration field is out of range or inconsistent.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
    /// A tensor length does not match the layout derived from the configuration.
    #[error("shape mismatch for {tensor} tensor: expected {expected} elements, got {got}")]
    ShapeMismatch {
        tensor: &'static str,
        expected: usize,
        got: usize,
    },
    /// The call arguments are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}
