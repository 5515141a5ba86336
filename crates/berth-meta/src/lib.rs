//! Repository metadata catalog for Berth.
//!
//! This crate holds the relational side of the hosting service:
//! - **Repositories**: ownership, visibility, default branch
//! - **Branches**: (repository, name) pairs with a mutable head pointer
//! - **Commits**: an immutable DAG of (repository, hash) records
//!
//! The catalog is deliberately independent of the on-disk object store; the
//! node crate coordinates the two and can re-derive catalog rows from
//! storage when they diverge.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod branch;
mod commit;
mod error;
mod repository;
mod store;

pub use branch::BranchRecord;
pub use commit::CommitRecord;
pub use error::{MetaError, Result};
pub use repository::{RepositoryRecord, Visibility};
pub use store::MetaStore;

/// Current unix time in milliseconds.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
