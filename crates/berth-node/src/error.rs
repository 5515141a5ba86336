//! API error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use berth_auth::AuthError;
use berth_git::GitError;
use berth_meta::MetaError;
use berth_storage::StoreError;
use serde::Serialize;

/// Errors a request can end with, before any response byte is written.
///
/// Streaming handlers never construct these once the body has started;
/// mid-stream failure stays inside the git protocol.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Catalog error (not found, conflict, foreign reference).
    #[error(transparent)]
    Meta(#[from] MetaError),

    /// Object store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Protocol engine error.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Token gate error.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Request body failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The web-session identity header is missing on a route requiring it.
    #[error("missing identity")]
    MissingIdentity,

    /// The object store mutated but the catalog write failed afterwards.
    ///
    /// The filesystem side is not rolled back; callers must treat the state
    /// as needing reconciliation, not as a no-op.
    #[error("partial consistency in {context}: {source}")]
    PartialConsistency {
        /// Operation that was underway.
        context: String,
        /// The catalog failure.
        source: MetaError,
    },

    /// Unexpected internal failure (join errors and the like).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Meta(MetaError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Meta(MetaError::AlreadyExists(_)) => StatusCode::CONFLICT,
            ApiError::Meta(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::AlreadyExists { .. }) => StatusCode::CONFLICT,
            ApiError::Store(StoreError::InvalidName(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Git(GitError::UnsupportedService(_))
            | ApiError::Git(GitError::Protocol(_))
            | ApiError::Git(GitError::InvalidPktLine(_)) => StatusCode::BAD_REQUEST,
            ApiError::Git(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(_) | ApiError::MissingIdentity => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PartialConsistency { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the state needs an explicit reconciliation pass.
    pub fn needs_reconciliation(&self) -> bool {
        matches!(self, ApiError::PartialConsistency { .. })
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    needs_reconciliation: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            needs_reconciliation: self.needs_reconciliation(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Maps a blocking-task join failure onto the API taxonomy.
pub fn join_error(e: tokio::task::JoinError) -> ApiError {
    ApiError::Internal(format!("blocking task failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (
                MetaError::NotFound("repository 'a/b'".into()).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                MetaError::AlreadyExists("repository 'a/b'".into()).into(),
                StatusCode::CONFLICT,
            ),
            (
                MetaError::ForeignReference("commit".into()).into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                StoreError::InvalidName("..".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                GitError::UnsupportedService("git-archive".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (AuthError::InvalidCredentials.into(), StatusCode::UNAUTHORIZED),
            (ApiError::MissingIdentity, StatusCode::UNAUTHORIZED),
            (
                ApiError::Validation("name too long".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{error}");
        }
    }

    #[test]
    fn test_partial_consistency_is_distinguishable() {
        let error = ApiError::PartialConsistency {
            context: "create repository".into(),
            source: MetaError::AlreadyExists("row".into()),
        };
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error.needs_reconciliation());

        let plain = ApiError::Internal("boom".into());
        assert!(!plain.needs_reconciliation());
    }

    #[test]
    fn test_body_flags_reconciliation() {
        let body = ErrorBody {
            error: "partial".into(),
            needs_reconciliation: true,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"needs_reconciliation\":true"));

        let body = ErrorBody {
            error: "plain".into(),
            needs_reconciliation: false,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("needs_reconciliation"));
    }
}
