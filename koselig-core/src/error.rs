//! Error types for Koselig operations

use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Query against {table} failed: {reason}")]
    QueryFailed { table: String, reason: String },

    #[error("Row from {table} could not be decoded: {reason}")]
    DecodeFailed { table: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Field resolution errors.
///
/// Invalid field references and malformed serialized values are handled by
/// dropping or passing through the value, so the only hard failure is a
/// collaborator that is not installed at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("Missing capability: {capability} must be installed to resolve fields")]
    MissingCapability { capability: String },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Master error type for all Koselig errors.
#[derive(Debug, Error)]
pub enum KoseligError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Field error: {0}")]
    Field(#[from] FieldError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Koselig operations.
pub type KoseligResult<T> = Result<T, KoseligError>;

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StorageError::LockPoisoned
    }
}

impl<T> From<std::sync::PoisonError<T>> for KoseligError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        KoseligError::Storage(StorageError::LockPoisoned)
    }
}

// =============================================================================
// TESTS
// =============================================================================
