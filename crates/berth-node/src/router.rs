//! Route table and middleware stack.

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{git_api, repo_api, token_api};

/// Builds the full application router.
///
/// The `.git` routes carry the token gate as a route layer so the challenge
/// fires before any handler; everything else resolves identity per handler.
pub fn build_router(state: AppState) -> Router {
    let git_routes = Router::new()
        .route("/{owner}/{name}.git/info/refs", get(git_api::info_refs))
        .route(
            "/{owner}/{name}.git/git-upload-pack",
            post(git_api::upload_pack),
        )
        .route(
            "/{owner}/{name}.git/git-receive-pack",
            post(git_api::receive_pack),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            git_api::git_auth,
        ));

    let api_routes = Router::new()
        .route("/repositories", post(repo_api::create_repository))
        .route("/repositories/{owner}", get(repo_api::list_repositories))
        .route(
            "/repositories/{owner}/{name}",
            get(repo_api::get_repository).delete(repo_api::delete_repository),
        )
        .route(
            "/repositories/{owner}/{name}/branches",
            get(repo_api::list_branches).post(repo_api::create_branch),
        )
        .route(
            "/repositories/{owner}/{name}/branches/{branch}/head",
            put(repo_api::update_branch_head),
        )
        .route(
            "/repositories/{owner}/{name}/commits",
            get(repo_api::list_commits).post(repo_api::append_commit),
        )
        .route(
            "/repositories/{owner}/{name}/reconcile",
            post(repo_api::reconcile),
        )
        .route(
            "/tokens",
            post(token_api::issue_token).get(token_api::list_tokens),
        )
        .route("/tokens/{id}", delete(token_api::revoke_token));

    Router::new()
        .route("/health", get(health))
        .merge(git_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
