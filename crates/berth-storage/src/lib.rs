//! Object store gateway for Berth.
//!
//! The single point of contact with the underlying Git plumbing (libgit2).
//! Owns the deterministic on-disk layout (`{root}/{owner}/{name}.git`),
//! name validation, creation/open/existence semantics, and handle lifetime.
//! Everything inside a repository — refs, objects, packs — is reached
//! through the [`RepoHandle`] this crate hands out.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod gateway;
mod layout;

pub use error::{Result, StoreError};
pub use gateway::{RepoHandle, StoreGateway};
pub use layout::{validate_name, StoreLayout, MAX_NAME_LENGTH};
