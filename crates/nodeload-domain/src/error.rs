//! Domain error types for node resolution.
//!
//! Not-found and unauthorized are deliberately absent from this enum: both
//! resolve to `Ok(None)` so that callers cannot probe for existence.

use thiserror::Error;

/// Fatal errors raised while resolving a node.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// The type tag is not registered with the dispatch table.
    #[error("unsupported type: {type_tag}")]
    UnsupportedType { type_tag: String },

    /// The underlying store failed.
    #[error("store error: {message}")]
    StoreError { message: String },

    /// A stored record could not be mapped onto a domain object.
    #[error("invalid record: {message}")]
    InvalidRecord { message: String },

    /// The fetch did not complete in time.
    #[error("timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
