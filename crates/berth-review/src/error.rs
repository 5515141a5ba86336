//! Error types for the review pipeline.

use thiserror::Error;

/// Errors surfaced by the review pipeline.
///
/// Any of these reaching the pre-receive hook rejects the command under
/// review; a failed review never approves by accident.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// The reviewer endpoint could not be reached or answered non-2xx.
    #[error("reviewer request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The reviewer answered with an empty content list.
    #[error("reviewer returned no content")]
    EmptyResponse,

    /// Rendering the patch for a command failed.
    #[error("diff rendering failed: {0}")]
    Diff(#[from] git2::Error),
}

/// Result alias for review operations.
pub type Result<T> = std::result::Result<T, ReviewError>;
