//! # Generator Error Types

use thiserror::Error;

/// Errors raised before any terrain work begins.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorError {
    /// A requested grid dimension was zero.
    #[error("invalid terrain dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested column count.
        width: usize,
        /// Requested row count.
        height: usize,
    },

    /// A generator parameter is outside its valid range.
    #[error("invalid generator configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for generator operations.
pub type GeneratorResult<T> = Result<T, GeneratorError>;
