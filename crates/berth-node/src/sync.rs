//! Dual-store coordination.
//!
//! Every operation touching both the object store and the catalog mutates
//! the object store first and writes the catalog second. A catalog failure
//! after the filesystem mutation is reported as [`ApiError::PartialConsistency`]
//! and never rolled back; [`reconcile`] re-derives catalog rows from storage
//! idempotently.

use berth_meta::{BranchRecord, CommitRecord, MetaError, MetaStore, RepositoryRecord, Visibility};
use berth_storage::{RepoHandle, StoreGateway};
use git2::{Oid, Repository, Signature, Sort};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{ApiError, ApiResult};

/// Creates a repository in both stores.
///
/// The catalog conflict is checked up front, before any filesystem
/// mutation; the gateway still refuses duplicates on its own for races
/// that slip past the check.
pub fn create_repository(
    meta: &MetaStore,
    gateway: &StoreGateway,
    owner: &str,
    name: &str,
    visibility: Visibility,
    default_branch: &str,
) -> ApiResult<RepositoryRecord> {
    if meta.get_repository(owner, name).is_some() {
        return Err(MetaError::AlreadyExists(format!("repository '{owner}/{name}'")).into());
    }

    gateway.create(owner, name, visibility, default_branch)?;

    meta.create_repository(owner, name, visibility, default_branch)
        .map_err(|source| ApiError::PartialConsistency {
            context: format!("create repository '{owner}/{name}'"),
            source,
        })
}

/// Deletes a repository from both stores.
///
/// A missing on-disk store is tolerated so a half-deleted repository can
/// still be cleaned up.
pub fn delete_repository(
    meta: &MetaStore,
    gateway: &StoreGateway,
    owner: &str,
    name: &str,
) -> ApiResult<RepositoryRecord> {
    meta.require_repository(owner, name)?;

    match gateway.remove(owner, name) {
        Ok(()) | Err(berth_storage::StoreError::NotFound { .. }) => {}
        Err(e) => return Err(e.into()),
    }

    meta.delete_repository(owner, name)
        .map_err(|source| ApiError::PartialConsistency {
            context: format!("delete repository '{owner}/{name}'"),
            source,
        })
}

/// What a mirror or reconciliation pass changed in the catalog.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Branch rows created or repointed.
    pub branches_updated: usize,
    /// Branch rows removed because the ref is gone.
    pub branches_removed: usize,
    /// Commit rows inserted.
    pub commits_recorded: usize,
}

/// Records the commit history reachable from `tip` (bounded below by
/// `stop`) into the catalog and returns the tip's row id.
///
/// Idempotent: commits already in the catalog are left untouched. Parents
/// outside the walk that were never recorded are linked best-effort.
fn record_history(
    meta: &MetaStore,
    repository_id: u64,
    repo: &Repository,
    tip: Oid,
    stop: Option<Oid>,
    report: &mut SyncReport,
) -> ApiResult<u64> {
    let mut walk = repo.revwalk().map_err(berth_git::GitError::from)?;
    walk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)
        .map_err(berth_git::GitError::from)?;
    walk.push(tip).map_err(berth_git::GitError::from)?;
    if let Some(stop) = stop {
        // Already-mirrored history does not need re-walking.
        let _ = walk.hide(stop);
    }

    for oid in walk {
        let oid = oid.map_err(berth_git::GitError::from)?;
        let hash = oid.to_string();
        if meta.find_commit_by_hash(repository_id, &hash).is_some() {
            continue;
        }

        let commit = repo.find_commit(oid).map_err(berth_git::GitError::from)?;
        let parents: Vec<u64> = commit
            .parent_ids()
            .filter_map(|p| meta.find_commit_by_hash(repository_id, &p.to_string()))
            .map(|record| record.id)
            .collect();

        let author = commit.author();
        let author_text = format!(
            "{} <{}>",
            author.name().unwrap_or("unknown"),
            author.email().unwrap_or("unknown")
        );
        let authored_at = commit.time().seconds().max(0) as u64 * 1000;

        meta.record_commit(
            repository_id,
            &hash,
            commit.message().unwrap_or("").trim_end(),
            &author_text,
            authored_at,
            parents,
        )?;
        report.commits_recorded += 1;
    }

    meta.find_commit_by_hash(repository_id, &tip.to_string())
        .map(|record| record.id)
        .ok_or_else(|| MetaError::NotFound(format!("commit '{tip}'")).into())
}

/// Mirrors a push's accepted ref updates into the catalog.
///
/// Only `refs/heads/*` commands touch branch rows; tags live in the object
/// store alone. Ref updates were already applied, so catalog failures here
/// surface as partial consistency.
pub fn mirror_push(
    meta: &MetaStore,
    repository_id: u64,
    repo: &Repository,
    outcome: &berth_git::ReceiveOutcome,
) -> ApiResult<SyncReport> {
    let mut report = SyncReport::default();

    for command in outcome.accepted() {
        let Some(branch) = command.branch_name() else {
            continue;
        };

        let mirrored = if command.new_id.is_zero() {
            match meta.remove_branch(repository_id, branch) {
                Ok(_) => {
                    report.branches_removed += 1;
                    Ok(())
                }
                // The row never existed; nothing to mirror.
                Err(MetaError::NotFound(_)) => Ok(()),
                Err(e) => Err(e.into()),
            }
        } else {
            let stop = (!command.old_id.is_zero()).then_some(command.old_id);
            record_history(meta, repository_id, repo, command.new_id, stop, &mut report).and_then(
                |tip_row| {
                    meta.upsert_branch(repository_id, branch, tip_row)?;
                    report.branches_updated += 1;
                    Ok(())
                },
            )
        };

        mirrored.map_err(|e| match e {
            ApiError::Meta(source) => ApiError::PartialConsistency {
                context: format!("mirror push to '{}'", command.ref_name),
                source,
            },
            other => other,
        })?;
    }

    meta.touch_repository(repository_id);
    Ok(report)
}

/// Re-derives branch and commit rows from the object store.
///
/// Walks every `refs/heads/*` ref, records missing commits, repoints branch
/// rows, and removes rows whose ref is gone. Safe to run repeatedly.
pub fn reconcile(
    meta: &MetaStore,
    repository_id: u64,
    repo: &Repository,
) -> ApiResult<SyncReport> {
    let mut report = SyncReport::default();
    let mut live: HashSet<String> = HashSet::new();

    let refs = repo
        .references_glob("refs/heads/*")
        .map_err(berth_git::GitError::from)?;
    for reference in refs {
        let reference = reference.map_err(berth_git::GitError::from)?;
        let (Some(name), Some(target)) = (reference.name(), reference.target()) else {
            continue;
        };
        let branch = name.trim_start_matches("refs/heads/").to_string();

        let tip_row = record_history(meta, repository_id, repo, target, None, &mut report)?;
        let current = meta.find_branch(repository_id, &branch);
        if current.as_ref().and_then(|b| b.head) != Some(tip_row) {
            meta.upsert_branch(repository_id, &branch, tip_row)?;
            report.branches_updated += 1;
        }
        live.insert(branch);
    }

    for branch in meta.list_branches(repository_id) {
        if !live.contains(&branch.name) {
            meta.remove_branch(repository_id, &branch.name)?;
            report.branches_removed += 1;
        }
    }

    meta.touch_repository(repository_id);
    Ok(report)
}

/// Points a branch at an existing commit, object store first.
pub fn update_branch_head(
    meta: &MetaStore,
    repository_id: u64,
    handle: &RepoHandle,
    branch: &str,
    hash: &str,
) -> ApiResult<BranchRecord> {
    let oid = Oid::from_str(hash)
        .map_err(|_| ApiError::Validation(format!("malformed commit hash '{hash}'")))?;
    handle
        .find_commit(oid)
        .map_err(|_| MetaError::NotFound(format!("commit '{hash}' in object store")))?;
    meta.find_branch(repository_id, branch)
        .ok_or_else(|| MetaError::NotFound(format!("branch '{branch}'")))?;

    handle
        .reference(&format!("refs/heads/{branch}"), oid, true, "head update")
        .map_err(berth_git::GitError::from)?;

    let mut report = SyncReport::default();
    record_history(meta, repository_id, handle, oid, None, &mut report)
        .and_then(|tip_row| Ok(meta.set_branch_head(repository_id, branch, tip_row)?))
        .map_err(|e| match e {
            ApiError::Meta(source) => ApiError::PartialConsistency {
                context: format!("update head of '{branch}'"),
                source,
            },
            other => other,
        })
}

/// Request body for appending a commit through the API.
#[derive(Debug, Clone, Deserialize)]
pub struct AppendCommit {
    /// Commit message.
    pub message: String,
    /// Author name.
    pub author: String,
    /// Author email.
    pub email: String,
    /// Parent commit hashes; two or more make a merge.
    #[serde(default)]
    pub parents: Vec<String>,
    /// Branch to advance to the new commit, if any.
    #[serde(default)]
    pub branch: Option<String>,
}

/// Creates a real commit object in the object store, then records the row.
///
/// The commit reuses the first parent's tree, or the empty tree for an
/// initial commit; this operation manages history shape, not content.
pub fn append_commit(
    meta: &MetaStore,
    repository_id: u64,
    handle: &RepoHandle,
    request: &AppendCommit,
) -> ApiResult<CommitRecord> {
    let mut parent_commits = Vec::with_capacity(request.parents.len());
    for hash in &request.parents {
        let oid = Oid::from_str(hash)
            .map_err(|_| ApiError::Validation(format!("malformed commit hash '{hash}'")))?;
        let commit = handle
            .find_commit(oid)
            .map_err(|_| MetaError::NotFound(format!("commit '{hash}' in object store")))?;
        parent_commits.push(commit);
    }

    let tree = match parent_commits.first() {
        Some(parent) => parent.tree().map_err(berth_git::GitError::from)?,
        None => {
            let empty = handle
                .treebuilder(None)
                .and_then(|builder| builder.write())
                .map_err(berth_git::GitError::from)?;
            handle.find_tree(empty).map_err(berth_git::GitError::from)?
        }
    };

    let sig = Signature::now(&request.author, &request.email)
        .map_err(|e| ApiError::Validation(format!("invalid author: {}", e.message())))?;
    let parent_refs: Vec<_> = parent_commits.iter().collect();
    let oid = handle
        .commit(None, &sig, &sig, &request.message, &tree, &parent_refs)
        .map_err(berth_git::GitError::from)?;

    let mut report = SyncReport::default();
    let row = record_history(meta, repository_id, handle, oid, None, &mut report).map_err(
        |e| match e {
            ApiError::Meta(source) => ApiError::PartialConsistency {
                context: "append commit".to_string(),
                source,
            },
            other => other,
        },
    )?;

    if let Some(branch) = &request.branch {
        handle
            .reference(&format!("refs/heads/{branch}"), oid, true, "commit append")
            .map_err(berth_git::GitError::from)?;
        meta.upsert_branch(repository_id, branch, row)
            .map_err(|source| ApiError::PartialConsistency {
                context: format!("advance branch '{branch}'"),
                source,
            })?;
    }

    meta.get_commit(row)
        .ok_or_else(|| ApiError::Internal("appended commit row vanished".to_string()))
}
