//! # Berth Node
//!
//! The HTTP server tying the Berth crates together:
//!
//! - **Git smart HTTP**: `/{owner}/{repo}.git/*` behind the token gate,
//!   streaming pack data end-to-end.
//! - **Repository API**: repository/branch/commit records, reconciliation.
//! - **Token API**: personal access token issuance and listing.
//!
//! ## Modules
//!
//! - [`config`] - YAML configuration with CLI overrides
//! - [`state`] - Shared application state and store wiring
//! - [`router`] - Route assembly and middleware layers
//! - [`git_api`] - Git smart HTTP handlers and the Basic-auth gate
//! - [`repo_api`] - Repository, branch, and commit endpoints
//! - [`token_api`] - Personal access token endpoints
//! - [`sync`] - Dual-store coordination (object store first, catalog second)
//! - [`error`] - API error taxonomy and HTTP mapping
//! - [`logging`] - Structured logging initialization

pub mod config;
pub mod error;
pub mod git_api;
pub mod logging;
pub mod repo_api;
pub mod router;
pub mod state;
pub mod sync;
pub mod token_api;
