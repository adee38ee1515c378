//! # World Error Types
//!
//! Three layers, innermost first:
//!
//! - [`StoreError`]: a persistence backend failed.
//! - [`TerrainError`]: the chunk pipeline failed (bad input, storage, codec).
//! - [`ServiceError`]: what a client is allowed to see.
//!
//! A missing chunk is never an error anywhere in this stack; lookups return
//! `Ok(None)`.

use std::io;

use terra_procedural::GeneratorError;
use thiserror::Error;

/// Errors raised by a chunk store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing medium failed.
    #[error("store i/o failed: {0}")]
    Io(#[from] io::Error),

    /// Persisted bytes do not form a valid record.
    #[error("corrupted record: {0}")]
    Corrupted(String),

    /// A structured file could not be written or parsed.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while resolving, generating, encoding or persisting chunks.
#[derive(Error, Debug)]
pub enum TerrainError {
    /// Caller-supplied parameters are unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The store failed.
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),

    /// An internal invariant does not hold (e.g. undecodable terrain).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<GeneratorError> for TerrainError {
    fn from(err: GeneratorError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Result type for chunk pipeline operations.
pub type TerrainResult<T> = Result<T, TerrainError>;

/// Errors returned to the requesting client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The request itself is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Anything else. Details are logged, never returned.
    #[error("internal server error")]
    Internal,
}

impl From<TerrainError> for ServiceError {
    fn from(err: TerrainError) -> Self {
        match err {
            TerrainError::InvalidInput(reason) => Self::InvalidInput(reason),
            TerrainError::Persistence(_) | TerrainError::Internal(_) => Self::Internal,
        }
    }
}

/// Result type for request handlers.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors raised while loading a world configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid TOML for a world config.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_hides_store_detail() {
        let err: ServiceError =
            TerrainError::Persistence(StoreError::Corrupted("row 7: bad magic".into())).into();

        assert_eq!(err, ServiceError::Internal);
        assert_eq!(err.to_string(), "internal server error");
    }

    #[test]
    fn test_invalid_input_passes_through() {
        let err: ServiceError = TerrainError::InvalidInput("chunk size 0".into()).into();
        assert_eq!(err, ServiceError::InvalidInput("chunk size 0".into()));
    }

    #[test]
    fn test_generator_error_is_invalid_input() {
        let err: TerrainError = GeneratorError::InvalidDimensions { width: 0, height: 4 }.into();
        assert!(matches!(err, TerrainError::InvalidInput(_)));
    }
}
