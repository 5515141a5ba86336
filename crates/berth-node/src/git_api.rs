//! Git smart HTTP endpoints.
//!
//! The three transport routes live behind [`git_auth`], an HTTP Basic gate
//! over the token store. Handlers bridge the async request/response bodies
//! onto the synchronous protocol engine in `berth-git` via blocking tasks:
//! the request body streams in through a [`StreamReader`], the response
//! streams out through a duplex pipe, and pack data is never buffered whole.

use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use berth_auth::{parse_basic_header, Principal};
use berth_git::GitService;
use berth_meta::RepositoryRecord;
use berth_storage::RepoHandle;
use futures::TryStreamExt;
use serde::Deserialize;
use tokio_util::io::{ReaderStream, StreamReader, SyncIoBridge};

use crate::error::{join_error, ApiError, ApiResult};
use crate::state::AppState;
use crate::sync;

/// Size of the duplex pipe between the protocol engine and the response
/// body. Matches the side-band frame size order of magnitude.
const RESPONSE_PIPE_BYTES: usize = 64 * 1024;

fn challenge() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Basic realm=\"berth\""),
        )],
        "authentication required\n",
    )
        .into_response()
}

/// Token gate for the `.git` routes.
///
/// Parses HTTP Basic credentials, validates them against the token store and
/// attaches the resulting git-transport [`Principal`] to the request. Every
/// failure mode answers 401 with a `Basic` challenge so git clients prompt
/// for credentials instead of giving up.
pub async fn git_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let credentials = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_basic_header);

    let Some(credentials) = credentials else {
        return challenge();
    };

    match state.tokens.validate(&credentials.username, &credentials.secret) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(username = %credentials.username, error = %e, "token gate refused");
            challenge()
        }
    }
}

/// Query string of an info/refs request.
#[derive(Debug, Deserialize)]
pub struct ServiceQuery {
    /// Requested service name; absent means the dumb protocol, which is
    /// not served.
    pub service: Option<String>,
}

/// Looks the repository up in the catalog and opens its object store.
///
/// Both stores must agree before any protocol byte is written; a catalog row
/// without a directory surfaces as a storage error, not a silent empty repo.
async fn open_repository(
    state: &AppState,
    owner: &str,
    name: &str,
) -> ApiResult<(RepositoryRecord, RepoHandle)> {
    let record = state.meta.require_repository(owner, name)?;
    let gateway = state.gateway.clone();
    let (owner, name) = (owner.to_string(), name.to_string());
    let handle = tokio::task::spawn_blocking(move || gateway.open(&owner, &name))
        .await
        .map_err(join_error)??;
    Ok((record, handle))
}

/// `GET /{owner}/{name}.git/info/refs?service=...` — ref advertisement.
///
/// The advertisement is small and bounded, so it is buffered rather than
/// streamed; only the pack-bearing POSTs stream.
pub async fn info_refs(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    Query(query): Query<ServiceQuery>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Response> {
    let service = GitService::from_name(query.service.as_deref().unwrap_or(""))
        .map_err(ApiError::Git)?;
    let (record, handle) = open_repository(&state, &owner, &name).await?;

    tracing::debug!(
        repo = %record.full_name(),
        username = %principal.username(),
        %service,
        "advertising refs"
    );

    let body = tokio::task::spawn_blocking(move || -> ApiResult<Vec<u8>> {
        let mut out = Vec::new();
        berth_git::advertise_refs(&mut out, &handle, service)?;
        Ok(out)
    })
    .await
    .map_err(join_error)??;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(service.advertisement_content_type()),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        body,
    )
        .into_response())
}

/// Wraps the request body as a blocking reader and opens the response pipe.
///
/// The bridges are constructed here, on the async runtime, because they
/// capture the current runtime handle; the blocking task only uses them.
fn protocol_pipes(
    request: Request,
) -> (
    SyncIoBridge<StreamReader<impl futures::Stream<Item = std::io::Result<axum::body::Bytes>>, axum::body::Bytes>>,
    SyncIoBridge<tokio::io::DuplexStream>,
    Body,
) {
    let body_stream = request
        .into_body()
        .into_data_stream()
        .map_err(std::io::Error::other);
    let input = SyncIoBridge::new(StreamReader::new(body_stream));

    let (pipe_local, pipe_remote) = tokio::io::duplex(RESPONSE_PIPE_BYTES);
    let output = SyncIoBridge::new(pipe_local);
    let body = Body::from_stream(ReaderStream::new(pipe_remote));

    (input, output, body)
}

fn streaming_response(service: GitService, body: Body) -> Response {
    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(service.result_content_type()),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        body,
    )
        .into_response()
}

/// `POST /{owner}/{name}.git/git-upload-pack` — serve a fetch or clone.
pub async fn upload_pack(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    Extension(principal): Extension<Principal>,
    request: Request,
) -> ApiResult<Response> {
    let (record, handle) = open_repository(&state, &owner, &name).await?;
    let (mut input, mut output, body) = protocol_pipes(request);

    tracing::info!(
        repo = %record.full_name(),
        username = %principal.username(),
        "serving upload-pack"
    );

    tokio::task::spawn_blocking(move || {
        match berth_git::upload_pack(&mut input, &mut output, &handle) {
            Ok(()) => {}
            Err(e) if e.is_disconnect() => {
                tracing::debug!(repo = %record.full_name(), "client disconnected during fetch");
            }
            Err(e) => {
                tracing::error!(repo = %record.full_name(), error = %e, "upload-pack failed");
            }
        }
        let _ = output.shutdown();
    });

    Ok(streaming_response(GitService::UploadPack, body))
}

/// `POST /{owner}/{name}.git/git-receive-pack` — accept a push.
///
/// The protocol result (including per-ref `ng` rejections) is the response;
/// once the report-status has been written the HTTP status is already 200.
/// The catalog mirror runs after the protocol completes, still inside the
/// blocking task; a mirror failure is logged as needing reconciliation and
/// never unwinds the applied ref updates.
pub async fn receive_pack(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    Extension(principal): Extension<Principal>,
    request: Request,
) -> ApiResult<Response> {
    let (record, handle) = open_repository(&state, &owner, &name).await?;
    let (mut input, mut output, body) = protocol_pipes(request);

    tracing::info!(
        repo = %record.full_name(),
        username = %principal.username(),
        "serving receive-pack"
    );

    let meta = state.meta.clone();
    let policy = state.policy.clone();
    let hook = state.hook.clone();
    tokio::task::spawn_blocking(move || {
        match berth_git::receive_pack(&mut input, &mut output, &handle, &policy, hook.as_ref()) {
            Ok(outcome) => {
                let _ = output.shutdown();
                for command in &outcome.commands {
                    match command.outcome() {
                        berth_git::CommandOutcome::Accepted => tracing::info!(
                            repo = %record.full_name(),
                            ref_name = %command.ref_name,
                            "ref update accepted"
                        ),
                        berth_git::CommandOutcome::Rejected(reason) => tracing::info!(
                            repo = %record.full_name(),
                            ref_name = %command.ref_name,
                            reason = %reason,
                            "ref update rejected"
                        ),
                        berth_git::CommandOutcome::Pending => {}
                    }
                }
                match sync::mirror_push(&meta, record.id, &handle, &outcome) {
                    Ok(report) => tracing::info!(
                        repo = %record.full_name(),
                        branches_updated = report.branches_updated,
                        branches_removed = report.branches_removed,
                        commits_recorded = report.commits_recorded,
                        "push mirrored into catalog"
                    ),
                    Err(e) => tracing::warn!(
                        repo = %record.full_name(),
                        error = %e,
                        "push applied but catalog mirror failed; reconciliation required"
                    ),
                }
            }
            Err(e) if e.is_disconnect() => {
                tracing::debug!(repo = %record.full_name(), "client disconnected during push");
                let _ = output.shutdown();
            }
            Err(e) => {
                tracing::error!(repo = %record.full_name(), error = %e, "receive-pack failed");
                let _ = output.shutdown();
            }
        }
    });

    Ok(streaming_response(GitService::ReceivePack, body))
}
