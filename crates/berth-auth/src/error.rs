//! Error types for the authentication gate.

use thiserror::Error;

/// Errors that can occur while issuing or validating tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token of the named user matched the supplied secret.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The matching token is past its expiry.
    #[error("token expired")]
    TokenExpired,

    /// The requested token was not found.
    #[error("token not found")]
    TokenNotFound,

    /// Hashing or hash parsing failed.
    #[error("crypto error: {0}")]
    Crypto(String),
}

/// Result type for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
