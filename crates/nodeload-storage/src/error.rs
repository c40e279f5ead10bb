//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No record of this kind with this key.
    #[error("{kind} not found: {key}")]
    RecordNotFound { kind: &'static str, key: String },

    /// A record with the same primary key or unique key already exists.
    #[error("duplicate {kind}: {key}")]
    DuplicateRecord { kind: &'static str, key: String },

    /// A record referenced by another one does not exist.
    #[error("{kind} {key} references missing {missing}")]
    DanglingReference {
        kind: &'static str,
        key: String,
        missing: String,
    },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Fixture file could not be read or parsed.
    #[error("fixture error in {path}: {message}")]
    FixtureError { path: String, message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

impl StorageError {
    pub(crate) fn not_found(kind: &'static str, key: impl ToString) -> Self {
        StorageError::RecordNotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub(crate) fn duplicate(kind: &'static str, key: impl ToString) -> Self {
        StorageError::DuplicateRecord {
            kind,
            key: key.to_string(),
        }
    }

    /// Returns true for the not-found variant.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::RecordNotFound { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
