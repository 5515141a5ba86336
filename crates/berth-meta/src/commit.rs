//! Commit records.

use serde::{Deserialize, Serialize};

/// A commit row in the catalog.
///
/// Identity is the (repository, hash) pair. Records are immutable once
/// inserted; parents link records within the same repository into a DAG —
/// zero parents for the initial commit, two or more for merges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Internal record id.
    pub id: u64,
    /// Owning repository record id.
    pub repository_id: u64,
    /// Object hash (lowercase hex).
    pub hash: String,
    /// Commit message.
    pub message: String,
    /// Author as recorded in the object store.
    pub author: String,
    /// Authorship timestamp (unix millis).
    pub authored_at: u64,
    /// Parent commit record ids.
    pub parents: Vec<u64>,
    /// Insertion timestamp (unix millis).
    pub created_at: u64,
}

impl CommitRecord {
    /// Creates a new record stamped with the current time.
    pub fn new(
        id: u64,
        repository_id: u64,
        hash: impl Into<String>,
        message: impl Into<String>,
        author: impl Into<String>,
        authored_at: u64,
        parents: Vec<u64>,
    ) -> Self {
        Self {
            id,
            repository_id,
            hash: hash.into(),
            message: message.into(),
            author: author.into(),
            authored_at,
            parents,
            created_at: crate::now_millis(),
        }
    }

    /// Whether this commit has two or more parents.
    pub fn is_merge(&self) -> bool {
        self.parents.len() >= 2
    }

    /// Whether this commit has no parents.
    pub fn is_initial(&self) -> bool {
        self.parents.is_empty()
    }
}
