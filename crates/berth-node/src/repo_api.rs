//! Repository, branch and commit endpoints.
//!
//! These routes sit behind the web-session boundary: the external session
//! layer authenticates the user and forwards the identity in the
//! `X-Berth-Identity` header. Mutations require it; reads do not.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use berth_auth::Principal;
use berth_meta::{BranchRecord, CommitRecord, RepositoryRecord, Visibility};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{join_error, ApiError, ApiResult};
use crate::state::AppState;
use crate::sync::{self, AppendCommit, SyncReport};

/// Header carrying the identity established by the web-session layer.
pub const IDENTITY_HEADER: &str = "x-berth-identity";

/// Resolves the web-session principal from the identity header.
pub fn web_identity(headers: &HeaderMap) -> ApiResult<Principal> {
    headers
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|username| !username.is_empty())
        .map(Principal::web)
        .ok_or(ApiError::MissingIdentity)
}

fn validated<T: Validate>(payload: T) -> ApiResult<T> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    Ok(payload)
}

// ==================== Repositories ====================

/// Body of `POST /repositories`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRepository {
    /// Owning user.
    #[validate(length(min = 1, max = 64))]
    pub owner: String,
    /// Repository name, without the `.git` suffix.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Visibility; public when omitted.
    #[serde(default)]
    pub visibility: Visibility,
    /// Default branch; `main` when omitted.
    #[serde(default = "default_branch")]
    #[validate(length(min = 1, max = 255))]
    pub default_branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

/// Repository metadata plus the newest catalogued authorship time.
#[derive(Debug, Serialize)]
pub struct RepositoryDetail {
    /// The catalog row.
    #[serde(flatten)]
    pub repository: RepositoryRecord,
    /// Authorship time of the newest commit (unix millis), if any.
    pub last_commit_at: Option<u64>,
}

/// `POST /repositories`.
pub async fn create_repository(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRepository>,
) -> ApiResult<(StatusCode, Json<RepositoryRecord>)> {
    let identity = web_identity(&headers)?;
    let payload = validated(payload)?;

    tracing::info!(
        owner = %payload.owner,
        name = %payload.name,
        visibility = payload.visibility.as_str(),
        username = %identity.username(),
        "creating repository"
    );

    let meta = state.meta.clone();
    let gateway = state.gateway.clone();
    let record = tokio::task::spawn_blocking(move || {
        sync::create_repository(
            &meta,
            &gateway,
            &payload.owner,
            &payload.name,
            payload.visibility,
            &payload.default_branch,
        )
    })
    .await
    .map_err(join_error)??;

    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /repositories/{owner}/{name}`.
pub async fn get_repository(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
) -> ApiResult<Json<RepositoryDetail>> {
    let repository = state.meta.require_repository(&owner, &name)?;
    let last_commit_at = state.meta.last_commit_time(repository.id);
    Ok(Json(RepositoryDetail {
        repository,
        last_commit_at,
    }))
}

/// `GET /repositories/{owner}`.
pub async fn list_repositories(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> ApiResult<Json<Vec<RepositoryRecord>>> {
    Ok(Json(state.meta.list_repositories(&owner)))
}

/// `DELETE /repositories/{owner}/{name}` — removes both stores.
pub async fn delete_repository(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let identity = web_identity(&headers)?;
    tracing::info!(
        repo = %format!("{owner}/{name}"),
        username = %identity.username(),
        "deleting repository"
    );

    let meta = state.meta.clone();
    let gateway = state.gateway.clone();
    tokio::task::spawn_blocking(move || sync::delete_repository(&meta, &gateway, &owner, &name))
        .await
        .map_err(join_error)??;

    Ok(StatusCode::NO_CONTENT)
}

// ==================== Branches ====================

/// Body of `POST /repositories/{owner}/{name}/branches`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBranch {
    /// Branch name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Hash of an already-catalogued commit to point the branch at.
    #[serde(default)]
    pub head_hash: Option<String>,
}

/// `GET /repositories/{owner}/{name}/branches`.
pub async fn list_branches(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
) -> ApiResult<Json<Vec<BranchRecord>>> {
    let repository = state.meta.require_repository(&owner, &name)?;
    Ok(Json(state.meta.list_branches(repository.id)))
}

/// `POST /repositories/{owner}/{name}/branches` — catalog row only.
///
/// The head, if given, must name a commit already in the catalog; pointing
/// the object-store ref is the job of the head-update route.
pub async fn create_branch(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
    Json(payload): Json<CreateBranch>,
) -> ApiResult<(StatusCode, Json<BranchRecord>)> {
    web_identity(&headers)?;
    let payload = validated(payload)?;

    let repository = state.meta.require_repository(&owner, &name)?;
    let head = match &payload.head_hash {
        Some(hash) => Some(
            state
                .meta
                .find_commit_by_hash(repository.id, hash)
                .map(|commit| commit.id)
                .ok_or_else(|| {
                    berth_meta::MetaError::NotFound(format!("commit '{hash}'"))
                })?,
        ),
        None => None,
    };
    let branch = state.meta.create_branch(repository.id, &payload.name, head)?;
    Ok((StatusCode::CREATED, Json(branch)))
}

/// Body of `PUT .../branches/{branch}/head`.
#[derive(Debug, Deserialize)]
pub struct SetHead {
    /// Target commit hash; must exist in the object store.
    pub hash: String,
}

/// `PUT /repositories/{owner}/{name}/branches/{branch}/head`.
///
/// Moves the object-store ref first, then the catalog row.
pub async fn update_branch_head(
    State(state): State<AppState>,
    Path((owner, name, branch)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(payload): Json<SetHead>,
) -> ApiResult<Json<BranchRecord>> {
    web_identity(&headers)?;
    let repository = state.meta.require_repository(&owner, &name)?;

    let meta = state.meta.clone();
    let gateway = state.gateway.clone();
    let record = tokio::task::spawn_blocking(move || {
        let handle = gateway.open(&owner, &name)?;
        sync::update_branch_head(&meta, repository.id, &handle, &branch, &payload.hash)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(record))
}

// ==================== Commits ====================

/// `GET /repositories/{owner}/{name}/commits` — newest authorship first.
pub async fn list_commits(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
) -> ApiResult<Json<Vec<CommitRecord>>> {
    let repository = state.meta.require_repository(&owner, &name)?;
    Ok(Json(state.meta.list_commits(repository.id)))
}

/// `POST /repositories/{owner}/{name}/commits`.
///
/// Writes a real commit object into the object store and records the row;
/// the optional `branch` advances that ref to the new commit.
pub async fn append_commit(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
    Json(payload): Json<AppendCommit>,
) -> ApiResult<(StatusCode, Json<CommitRecord>)> {
    web_identity(&headers)?;
    if payload.message.trim().is_empty() {
        return Err(ApiError::Validation("message must not be empty".into()));
    }
    let repository = state.meta.require_repository(&owner, &name)?;

    let meta = state.meta.clone();
    let gateway = state.gateway.clone();
    let record = tokio::task::spawn_blocking(move || {
        let handle = gateway.open(&owner, &name)?;
        sync::append_commit(&meta, repository.id, &handle, &payload)
    })
    .await
    .map_err(join_error)??;

    Ok((StatusCode::CREATED, Json(record)))
}

// ==================== Reconciliation ====================

/// `POST /repositories/{owner}/{name}/reconcile`.
///
/// Re-derives branch and commit rows from the object store. Idempotent;
/// safe to call after any partial-consistency failure.
pub async fn reconcile(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Json<SyncReport>> {
    let identity = web_identity(&headers)?;
    let repository = state.meta.require_repository(&owner, &name)?;

    tracing::info!(
        repo = %repository.full_name(),
        username = %identity.username(),
        "reconciling catalog from object store"
    );

    let meta = state.meta.clone();
    let gateway = state.gateway.clone();
    let report = tokio::task::spawn_blocking(move || {
        let handle = gateway.open(&owner, &name)?;
        sync::reconcile(&meta, repository.id, &handle)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(report))
}
