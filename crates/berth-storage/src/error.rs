//! Error types for the object store gateway.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in gateway operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No repository directory exists for the key.
    #[error("repository '{owner}/{name}' not found")]
    NotFound {
        /// Owning user.
        owner: String,
        /// Repository name.
        name: String,
    },

    /// A repository already exists for the key.
    #[error("repository '{owner}/{name}' already exists")]
    AlreadyExists {
        /// Owning user.
        owner: String,
        /// Repository name.
        name: String,
    },

    /// The directory exists but does not hold a valid bare repository.
    #[error("path '{0}' is not a git repository")]
    NotARepository(PathBuf),

    /// An owner or repository name failed validation.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Underlying plumbing error.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, StoreError>;
