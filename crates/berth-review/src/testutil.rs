//! Fixtures for tests that need real commits.

use git2::{Oid, Repository, RepositoryInitOptions};
use tempfile::TempDir;

pub fn bare_repo() -> (TempDir, Repository) {
    let tmp = TempDir::new().unwrap();
    let mut opts = RepositoryInitOptions::new();
    opts.bare(true).initial_head("main");
    let repo = Repository::init_opts(tmp.path(), &opts).unwrap();
    (tmp, repo)
}

/// Writes one file into a fresh tree and commits it, without moving any ref.
pub fn commit_file(
    repo: &Repository,
    file: &str,
    content: &str,
    message: &str,
    parents: &[Oid],
) -> Oid {
    let blob = repo.blob(content.as_bytes()).unwrap();
    let mut builder = repo.treebuilder(None).unwrap();
    builder.insert(file, blob, 0o100644).unwrap();
    let tree_id = builder.write().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let signature = git2::Signature::now("Test User", "test@example.com").unwrap();
    let parents: Vec<_> = parents
        .iter()
        .map(|id| repo.find_commit(*id).unwrap())
        .collect();
    let parent_refs: Vec<_> = parents.iter().collect();

    repo.commit(None, &signature, &signature, message, &tree, &parent_refs)
        .unwrap()
}
