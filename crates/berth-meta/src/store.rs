//! In-memory metadata catalog.

use crate::{
    branch::BranchRecord,
    commit::CommitRecord,
    error::{MetaError, Result},
    repository::{RepositoryRecord, Visibility},
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe catalog of repository, branch, and commit records.
///
/// The catalog is the application truth for what the API exposes; the on-disk
/// object store remains the physical truth for what bytes exist. Invariants
/// enforced here: (owner, name) is unique per repository, (repository, name)
/// is unique per branch, (repository, hash) is unique per commit, and a
/// branch head or commit parent must reference a commit of the same
/// repository.
#[derive(Debug, Default)]
pub struct MetaStore {
    /// Next available ID for new records.
    next_id: AtomicU64,

    /// Repositories by ID.
    repositories: RwLock<HashMap<u64, RepositoryRecord>>,

    /// "owner/name" to repository ID mapping.
    repo_key_index: RwLock<HashMap<String, u64>>,

    /// Branches by ID.
    branches: RwLock<HashMap<u64, BranchRecord>>,

    /// (repository ID, branch name) to branch ID mapping.
    branch_index: RwLock<HashMap<(u64, String), u64>>,

    /// Commits by ID.
    commits: RwLock<HashMap<u64, CommitRecord>>,

    /// (repository ID, commit hash) to commit ID mapping.
    commit_hash_index: RwLock<HashMap<(u64, String), u64>>,
}

fn repo_key(owner: &str, name: &str) -> String {
    format!("{}/{}", owner, name)
}

impl MetaStore {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a new unique ID.
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    // ==================== Repositories ====================

    /// Insert a repository row.
    pub fn create_repository(
        &self,
        owner: &str,
        name: &str,
        visibility: Visibility,
        default_branch: &str,
    ) -> Result<RepositoryRecord> {
        let key = repo_key(owner, name);
        if self.repo_key_index.read().contains_key(&key) {
            return Err(MetaError::AlreadyExists(format!("repository '{}'", key)));
        }

        let id = self.next_id();
        let repo = RepositoryRecord::new(id, owner, name, visibility, default_branch);

        self.repositories.write().insert(id, repo.clone());
        self.repo_key_index.write().insert(key, id);

        Ok(repo)
    }

    /// Get a repository by (owner, name).
    pub fn get_repository(&self, owner: &str, name: &str) -> Option<RepositoryRecord> {
        let id = self.repo_key_index.read().get(&repo_key(owner, name)).copied()?;
        self.repositories.read().get(&id).cloned()
    }

    /// Get a repository by (owner, name) or fail with NotFound.
    pub fn require_repository(&self, owner: &str, name: &str) -> Result<RepositoryRecord> {
        self.get_repository(owner, name)
            .ok_or_else(|| MetaError::NotFound(format!("repository '{}/{}'", owner, name)))
    }

    /// List a user's repositories, ordered by name.
    pub fn list_repositories(&self, owner: &str) -> Vec<RepositoryRecord> {
        let mut repos: Vec<_> = self
            .repositories
            .read()
            .values()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect();
        repos.sort_by(|a, b| a.name.cmp(&b.name));
        repos
    }

    /// Delete a repository row along with its branch and commit rows.
    pub fn delete_repository(&self, owner: &str, name: &str) -> Result<RepositoryRecord> {
        let key = repo_key(owner, name);
        let id = self
            .repo_key_index
            .write()
            .remove(&key)
            .ok_or_else(|| MetaError::NotFound(format!("repository '{}'", key)))?;
        let repo = self
            .repositories
            .write()
            .remove(&id)
            .ok_or_else(|| MetaError::NotFound(format!("repository '{}'", key)))?;

        self.branches.write().retain(|_, b| b.repository_id != id);
        self.branch_index.write().retain(|(rid, _), _| *rid != id);
        self.commits.write().retain(|_, c| c.repository_id != id);
        self.commit_hash_index.write().retain(|(rid, _), _| *rid != id);

        Ok(repo)
    }

    /// Bump a repository's updated_at stamp.
    pub fn touch_repository(&self, repository_id: u64) {
        if let Some(repo) = self.repositories.write().get_mut(&repository_id) {
            repo.updated_at = crate::now_millis();
        }
    }

    // ==================== Branches ====================

    /// Insert a branch row. The head, if given, must reference a commit of
    /// the same repository.
    pub fn create_branch(
        &self,
        repository_id: u64,
        name: &str,
        head: Option<u64>,
    ) -> Result<BranchRecord> {
        let repo = self.require_repo_by_id(repository_id)?;
        if let Some(commit_id) = head {
            self.check_commit_in_repo(repository_id, commit_id)?;
        }
        let index_key = (repository_id, name.to_string());
        if self.branch_index.read().contains_key(&index_key) {
            return Err(MetaError::AlreadyExists(format!(
                "branch '{}' in repository '{}'",
                name,
                repo.full_name()
            )));
        }

        let id = self.next_id();
        let branch = BranchRecord::new(id, repository_id, name, head, name == repo.default_branch);

        self.branches.write().insert(id, branch.clone());
        self.branch_index.write().insert(index_key, id);

        Ok(branch)
    }

    /// Point an existing branch at a commit of the same repository.
    pub fn set_branch_head(
        &self,
        repository_id: u64,
        name: &str,
        commit_id: u64,
    ) -> Result<BranchRecord> {
        self.check_commit_in_repo(repository_id, commit_id)?;
        let branch_id = self
            .branch_index
            .read()
            .get(&(repository_id, name.to_string()))
            .copied()
            .ok_or_else(|| MetaError::NotFound(format!("branch '{}'", name)))?;

        let mut branches = self.branches.write();
        let branch = branches
            .get_mut(&branch_id)
            .ok_or_else(|| MetaError::NotFound(format!("branch '{}'", name)))?;
        branch.head = Some(commit_id);
        branch.updated_at = crate::now_millis();
        Ok(branch.clone())
    }

    /// Point a branch at a commit, inserting the row if the branch is new.
    /// Used when mirroring pushes and when re-deriving records from storage.
    pub fn upsert_branch(
        &self,
        repository_id: u64,
        name: &str,
        commit_id: u64,
    ) -> Result<BranchRecord> {
        if self.find_branch(repository_id, name).is_some() {
            self.set_branch_head(repository_id, name, commit_id)
        } else {
            self.create_branch(repository_id, name, Some(commit_id))
        }
    }

    /// Get a branch by (repository, name).
    pub fn find_branch(&self, repository_id: u64, name: &str) -> Option<BranchRecord> {
        let id = self
            .branch_index
            .read()
            .get(&(repository_id, name.to_string()))
            .copied()?;
        self.branches.read().get(&id).cloned()
    }

    /// List a repository's branches, ordered by name.
    pub fn list_branches(&self, repository_id: u64) -> Vec<BranchRecord> {
        let mut branches: Vec<_> = self
            .branches
            .read()
            .values()
            .filter(|b| b.repository_id == repository_id)
            .cloned()
            .collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        branches
    }

    /// Remove a branch row. Used when re-derivation finds the ref gone.
    pub fn remove_branch(&self, repository_id: u64, name: &str) -> Result<BranchRecord> {
        let id = self
            .branch_index
            .write()
            .remove(&(repository_id, name.to_string()))
            .ok_or_else(|| MetaError::NotFound(format!("branch '{}'", name)))?;
        self.branches
            .write()
            .remove(&id)
            .ok_or_else(|| MetaError::NotFound(format!("branch '{}'", name)))
    }

    // ==================== Commits ====================

    /// Insert a commit row. Idempotent on (repository, hash): recording a
    /// hash that already exists returns the existing row untouched. Parents
    /// must already exist in the same repository.
    pub fn record_commit(
        &self,
        repository_id: u64,
        hash: &str,
        message: &str,
        author: &str,
        authored_at: u64,
        parents: Vec<u64>,
    ) -> Result<CommitRecord> {
        self.require_repo_by_id(repository_id)?;
        let index_key = (repository_id, hash.to_string());
        if let Some(id) = self.commit_hash_index.read().get(&index_key).copied() {
            if let Some(existing) = self.commits.read().get(&id) {
                return Ok(existing.clone());
            }
        }
        for parent in &parents {
            self.check_commit_in_repo(repository_id, *parent)?;
        }

        let id = self.next_id();
        let commit =
            CommitRecord::new(id, repository_id, hash, message, author, authored_at, parents);

        self.commits.write().insert(id, commit.clone());
        self.commit_hash_index.write().insert(index_key, id);

        Ok(commit)
    }

    /// Get a commit by ID.
    pub fn get_commit(&self, id: u64) -> Option<CommitRecord> {
        self.commits.read().get(&id).cloned()
    }

    /// Get a commit by (repository, hash).
    pub fn find_commit_by_hash(&self, repository_id: u64, hash: &str) -> Option<CommitRecord> {
        let id = self
            .commit_hash_index
            .read()
            .get(&(repository_id, hash.to_string()))
            .copied()?;
        self.commits.read().get(&id).cloned()
    }

    /// List a repository's commits, newest authorship first.
    pub fn list_commits(&self, repository_id: u64) -> Vec<CommitRecord> {
        let mut commits: Vec<_> = self
            .commits
            .read()
            .values()
            .filter(|c| c.repository_id == repository_id)
            .cloned()
            .collect();
        commits.sort_by(|a, b| b.authored_at.cmp(&a.authored_at).then(b.id.cmp(&a.id)));
        commits
    }

    /// Authorship time of the repository's newest commit, if any.
    pub fn last_commit_time(&self, repository_id: u64) -> Option<u64> {
        self.commits
            .read()
            .values()
            .filter(|c| c.repository_id == repository_id)
            .map(|c| c.authored_at)
            .max()
    }

    // ==================== Internal helpers ====================

    fn require_repo_by_id(&self, repository_id: u64) -> Result<RepositoryRecord> {
        self.repositories
            .read()
            .get(&repository_id)
            .cloned()
            .ok_or_else(|| MetaError::NotFound(format!("repository id {}", repository_id)))
    }

    fn check_commit_in_repo(&self, repository_id: u64, commit_id: u64) -> Result<()> {
        let commits = self.commits.read();
        let commit = commits
            .get(&commit_id)
            .ok_or_else(|| MetaError::NotFound(format!("commit id {}", commit_id)))?;
        if commit.repository_id != repository_id {
            return Err(MetaError::ForeignReference(format!(
                "commit {} belongs to repository id {}",
                commit.hash, commit.repository_id
            )));
        }
        Ok(())
    }
}
