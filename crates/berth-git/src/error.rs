//! Error types for the protocol engine.

use thiserror::Error;

/// Errors that can occur while speaking the git wire protocol.
#[derive(Debug, Error)]
pub enum GitError {
    /// A pkt-line frame could not be decoded or encoded.
    #[error("invalid pkt-line: {0}")]
    InvalidPktLine(String),

    /// The request violated the smart HTTP protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The client asked for a service we do not speak.
    #[error("unsupported service: {0}")]
    UnsupportedService(String),

    /// Underlying plumbing error.
    #[error("git error: {0}")]
    Plumbing(#[from] git2::Error),

    /// Transport error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// Whether this error means the peer went away mid-transfer.
    ///
    /// Disconnects are benign: the channel that could carry an error response
    /// is already gone, so callers log them at debug level and stop.
    pub fn is_disconnect(&self) -> bool {
        use std::io::ErrorKind;
        matches!(
            self,
            Self::Io(e) if matches!(
                e.kind(),
                ErrorKind::BrokenPipe
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::UnexpectedEof
            )
        )
    }
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, GitError>;
