//! Shared fixtures for protocol tests.

use git2::{Oid, Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

/// Creates an empty bare repository with HEAD pointing at `main`.
pub(crate) fn bare_repo() -> (TempDir, Repository) {
    let tmp = TempDir::new().unwrap();
    let mut opts = RepositoryInitOptions::new();
    opts.bare(true).initial_head("main");
    let repo = Repository::init_opts(tmp.path(), &opts).unwrap();
    (tmp, repo)
}

/// Writes one file into a fresh tree and commits it. Pass `update_ref` to
/// move a ref, or `None` to create a dangling commit object.
pub(crate) fn commit_file(
    repo: &Repository,
    update_ref: Option<&str>,
    file: &str,
    content: &str,
    message: &str,
    parents: &[Oid],
) -> Oid {
    let blob = repo.blob(content.as_bytes()).unwrap();
    let mut builder = repo.treebuilder(None).unwrap();
    builder.insert(file, blob, 0o100644).unwrap();
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();

    let sig = Signature::now("Test User", "test@example.com").unwrap();
    let parent_commits: Vec<_> = parents
        .iter()
        .map(|id| repo.find_commit(*id).unwrap())
        .collect();
    let parent_refs: Vec<_> = parent_commits.iter().collect();

    repo.commit(update_ref, &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

/// Writer standing in for a client that hangs up: accepts `budget` bytes,
/// then every write fails with `BrokenPipe`.
pub(crate) struct DisconnectingWriter {
    budget: usize,
    pub(crate) written: Vec<u8>,
}

impl DisconnectingWriter {
    pub(crate) fn new(budget: usize) -> Self {
        Self {
            budget,
            written: Vec::new(),
        }
    }
}

impl std::io::Write for DisconnectingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.budget == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        }
        let n = buf.len().min(self.budget);
        self.budget -= n;
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Builds a self-contained pack holding everything reachable from `tip`,
/// minus anything reachable from `base`.
pub(crate) fn pack_between(repo: &Repository, tip: Oid, base: Option<Oid>) -> Vec<u8> {
    let mut walk = repo.revwalk().unwrap();
    walk.push(tip).unwrap();
    if let Some(base) = base {
        walk.hide(base).unwrap();
    }
    let mut builder = repo.packbuilder().unwrap();
    builder.insert_walk(&mut walk).unwrap();
    let mut buf = git2::Buf::new();
    builder.write_buf(&mut buf).unwrap();
    buf.to_vec()
}
