//! Error types for the metadata catalog.

use thiserror::Error;

/// Errors that can occur in catalog operations.
#[derive(Debug, Error)]
pub enum MetaError {
    /// The requested record was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A record with the same identity already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A reference points at a record in a different repository.
    #[error("foreign reference: {0}")]
    ForeignReference(String),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, MetaError>;
