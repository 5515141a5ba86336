//! Repository records.

use serde::{Deserialize, Serialize};

/// Visibility of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Public repository.
    #[default]
    Public,
    /// Private repository.
    Private,
}

impl Visibility {
    /// Parses a visibility string as written to repository config.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }

    /// Returns the lowercase name used in config and API bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

/// A repository row in the catalog.
///
/// Identity is the (owner, name) pair; the numeric id is an internal key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Internal record id.
    pub id: u64,
    /// Owning user.
    pub owner: String,
    /// Repository name (without the `.git` suffix).
    pub name: String,
    /// Repository visibility.
    pub visibility: Visibility,
    /// Default branch name.
    pub default_branch: String,
    /// Creation timestamp (unix millis).
    pub created_at: u64,
    /// Last mutation timestamp (unix millis).
    pub updated_at: u64,
}

impl RepositoryRecord {
    /// Creates a new record stamped with the current time.
    pub fn new(
        id: u64,
        owner: impl Into<String>,
        name: impl Into<String>,
        visibility: Visibility,
        default_branch: impl Into<String>,
    ) -> Self {
        let now = crate::now_millis();
        Self {
            id,
            owner: owner.into(),
            name: name.into(),
            visibility,
            default_branch: default_branch.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the full name (owner/name).
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}
