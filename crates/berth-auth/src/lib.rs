//! Token authentication for the Berth git transport.
//!
//! Personal access tokens gate the `.git` endpoints: the secret is generated
//! server-side, returned exactly once, and only its Argon2id hash is kept.
//! Validation produces a [`Principal`] scoped to git transport, a separate
//! variant from the web-session identity so neither chain can impersonate
//! the other.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod basic;
mod error;
mod principal;
mod store;
mod token;

pub use basic::{parse_basic_header, BasicCredentials};
pub use error::{AuthError, Result};
pub use principal::Principal;
pub use store::TokenStore;
pub use token::{TokenRecord, TokenResponse, DEFAULT_SCOPE, DEFAULT_TTL_DAYS, SECRET_LENGTH};

/// Current unix time in seconds.
pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
