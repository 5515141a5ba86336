//! Token management endpoints.
//!
//! Issuance and listing run on the web-session side of the house; the
//! tokens themselves are only ever presented on the git transport. The raw
//! secret appears in exactly one response, at issuance.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use berth_auth::TokenResponse;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{join_error, ApiError, ApiResult};
use crate::repo_api::web_identity;
use crate::state::AppState;

/// Body of `POST /tokens`.
#[derive(Debug, Deserialize, Validate)]
pub struct IssueToken {
    /// Display name, e.g. `laptop` or `ci`.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Scope string; the read-write default when omitted.
    #[serde(default)]
    pub scope: Option<String>,
    /// Lifetime in days; the configured default when omitted, `0` for a
    /// non-expiring token.
    #[serde(default)]
    pub ttl_days: Option<u64>,
}

/// Issuance response: the token metadata, the raw secret, and the warning
/// that the secret will not be shown again.
#[derive(Debug, Serialize)]
pub struct IssuedToken {
    /// Token metadata plus the raw secret.
    #[serde(flatten)]
    pub token: TokenResponse,
    /// One-time warning attached to the issuance response.
    pub note: &'static str,
}

const ISSUANCE_NOTE: &str = "store this token now; it cannot be retrieved again";

/// `POST /tokens` — issue a token for the calling user.
///
/// The response carries the raw secret; it is not stored and cannot be
/// retrieved again.
pub async fn issue_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IssueToken>,
) -> ApiResult<(StatusCode, Json<IssuedToken>)> {
    let identity = web_identity(&headers)?;
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let username = identity.username().to_string();
    let scope = payload
        .scope
        .unwrap_or_else(|| berth_auth::DEFAULT_SCOPE.to_string());
    let ttl_days = payload.ttl_days.or(Some(state.token_ttl_days));

    // Argon2id hashing is deliberately slow; keep it off the async runtime.
    let tokens = state.tokens.clone();
    let name = payload.name;
    let (record, secret) =
        tokio::task::spawn_blocking(move || tokens.issue(&username, &name, &scope, ttl_days))
            .await
            .map_err(join_error)??;

    tracing::info!(
        username = %record.username,
        token = %record.name,
        expires_at = ?record.expires_at,
        "token issued"
    );

    Ok((
        StatusCode::CREATED,
        Json(IssuedToken {
            token: record.to_response(Some(&secret)),
            note: ISSUANCE_NOTE,
        }),
    ))
}

/// `GET /tokens` — the calling user's token metadata, newest first.
pub async fn list_tokens(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<TokenResponse>>> {
    let identity = web_identity(&headers)?;
    let tokens = state
        .tokens
        .list_for_user(identity.username())
        .iter()
        .map(|record| record.to_response(None))
        .collect();
    Ok(Json(tokens))
}

/// `DELETE /tokens/{id}` — revoke one of the caller's tokens.
pub async fn revoke_token(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let identity = web_identity(&headers)?;
    state.tokens.revoke(identity.username(), id)?;
    tracing::info!(username = %identity.username(), token_id = id, "token revoked");
    Ok(StatusCode::NO_CONTENT)
}
