//! Branch records.

use serde::{Deserialize, Serialize};

/// A branch row in the catalog.
///
/// Identity is the (repository, name) pair. The head pointer is the only
/// field that is mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRecord {
    /// Internal record id.
    pub id: u64,
    /// Owning repository record id.
    pub repository_id: u64,
    /// Branch name (without the `refs/heads/` prefix).
    pub name: String,
    /// Head commit record id, if the branch has been born.
    pub head: Option<u64>,
    /// Whether this is the repository's default branch.
    pub is_default: bool,
    /// Creation timestamp (unix millis).
    pub created_at: u64,
    /// Last head mutation timestamp (unix millis).
    pub updated_at: u64,
}

impl BranchRecord {
    /// Creates a new record stamped with the current time.
    pub fn new(
        id: u64,
        repository_id: u64,
        name: impl Into<String>,
        head: Option<u64>,
        is_default: bool,
    ) -> Self {
        let now = crate::now_millis();
        Self {
            id,
            repository_id,
            name: name.into(),
            head,
            is_default,
            created_at: now,
            updated_at: now,
        }
    }
}
