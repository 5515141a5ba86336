//! Bare-repository creation and open semantics.

use crate::{
    error::{Result, StoreError},
    layout::StoreLayout,
};
use berth_meta::Visibility;
use git2::{ErrorCode, Repository, RepositoryInitOptions, RepositoryOpenFlags};
use std::ffi::OsStr;
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Config key recording the repository's visibility.
const VISIBILITY_KEY: &str = "berth.visibility";

/// A scoped handle on an open bare repository.
///
/// Dereferences to [`git2::Repository`]; the underlying libgit2 handle is
/// released when the value is dropped, on every exit path.
pub struct RepoHandle {
    path: PathBuf,
    repo: Repository,
}

impl RepoHandle {
    /// The on-disk repository directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Visibility as recorded in the repository config.
    pub fn visibility(&self) -> Visibility {
        self.repo
            .config()
            .and_then(|c| c.get_string(VISIBILITY_KEY))
            .ok()
            .and_then(|s| Visibility::parse(&s))
            .unwrap_or_default()
    }

    /// The branch HEAD points at, when HEAD is symbolic.
    pub fn default_branch(&self) -> Option<String> {
        let head = self.repo.find_reference("HEAD").ok()?;
        let target = head.symbolic_target()?;
        Some(target.trim_start_matches("refs/heads/").to_string())
    }
}

impl Deref for RepoHandle {
    type Target = Repository;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}

impl std::fmt::Debug for RepoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoHandle").field("path", &self.path).finish()
    }
}

/// Single point of contact with the on-disk object stores.
///
/// Owns path resolution and existence/creation semantics; everything below
/// the ref level is delegated to libgit2 through the returned handles.
#[derive(Debug, Clone)]
pub struct StoreGateway {
    layout: StoreLayout,
}

impl StoreGateway {
    /// Creates a gateway over the given layout.
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Creates a gateway rooted at the given directory.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self::new(StoreLayout::new(root))
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Creates a bare repository for (owner, name), configured to accept
    /// pushes over HTTP, with HEAD pointing at the default branch.
    ///
    /// Concurrent duplicate creates are safe: the init refuses to touch an
    /// existing repository, so the losing caller observes `AlreadyExists`
    /// and the winner's repository is left intact.
    pub fn create(
        &self,
        owner: &str,
        name: &str,
        visibility: Visibility,
        default_branch: &str,
    ) -> Result<RepoHandle> {
        let dir = self.layout.repo_dir(owner, name)?;
        if dir.exists() {
            return Err(StoreError::AlreadyExists {
                owner: owner.to_string(),
                name: name.to_string(),
            });
        }
        if let Some(parent) = dir.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut opts = RepositoryInitOptions::new();
        opts.bare(true).no_reinit(true).initial_head(default_branch);
        let repo = Repository::init_opts(&dir, &opts).map_err(|e| {
            if e.code() == ErrorCode::Exists {
                StoreError::AlreadyExists {
                    owner: owner.to_string(),
                    name: name.to_string(),
                }
            } else {
                StoreError::Git(e)
            }
        })?;

        let mut config = repo.config()?;
        config.set_bool("http.receivepack", true)?;
        config.set_str(VISIBILITY_KEY, visibility.as_str())?;

        tracing::debug!(owner = %owner, name = %name, path = %dir.display(), "created bare repository");
        Ok(RepoHandle { path: dir, repo })
    }

    /// Opens the bare repository for (owner, name).
    ///
    /// Fails with `NotFound` when the directory is absent and with
    /// `NotARepository` when it is present but not a valid repository.
    pub fn open(&self, owner: &str, name: &str) -> Result<RepoHandle> {
        let dir = self.layout.repo_dir(owner, name)?;
        if !dir.exists() {
            return Err(StoreError::NotFound {
                owner: owner.to_string(),
                name: name.to_string(),
            });
        }

        let repo = Repository::open_ext(
            &dir,
            RepositoryOpenFlags::NO_SEARCH
                | RepositoryOpenFlags::BARE
                | RepositoryOpenFlags::NO_DOTGIT,
            &[] as &[&OsStr],
        )
        .map_err(|_| StoreError::NotARepository(dir.clone()))?;

        Ok(RepoHandle { path: dir, repo })
    }

    /// Whether a repository directory exists for (owner, name).
    pub fn exists(&self, owner: &str, name: &str) -> Result<bool> {
        let dir = self.layout.repo_dir(owner, name)?;
        Ok(dir.is_dir() && dir.join("HEAD").is_file())
    }

    /// Removes the on-disk store for (owner, name).
    pub fn remove(&self, owner: &str, name: &str) -> Result<()> {
        let dir = self.layout.repo_dir(owner, name)?;
        if !dir.exists() {
            return Err(StoreError::NotFound {
                owner: owner.to_string(),
                name: name.to_string(),
            });
        }
        std::fs::remove_dir_all(&dir)?;
        tracing::debug!(owner = %owner, name = %name, "removed repository store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gateway() -> (TempDir, StoreGateway) {
        let tmp = TempDir::new().unwrap();
        let gw = StoreGateway::at(tmp.path());
        (tmp, gw)
    }

    #[test]
    fn test_create_then_open_is_bare_with_push_enabled() {
        let (_tmp, gw) = gateway();
        gw.create("alice", "widget", Visibility::Private, "main").unwrap();

        let handle = gw.open("alice", "widget").unwrap();
        assert!(handle.is_bare());
        assert_eq!(handle.visibility(), Visibility::Private);
        assert_eq!(handle.default_branch().as_deref(), Some("main"));

        let config = handle.config().unwrap();
        assert!(config.get_bool("http.receivepack").unwrap());
    }

    #[test]
    fn test_create_twice_is_conflict_and_leaves_one_repository() {
        let (_tmp, gw) = gateway();
        gw.create("alice", "widget", Visibility::Public, "main").unwrap();

        let err = gw
            .create("alice", "widget", Visibility::Public, "main")
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));

        // The first repository is still intact and usable.
        let handle = gw.open("alice", "widget").unwrap();
        assert!(handle.is_bare());
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let (_tmp, gw) = gateway();
        let err = gw.open("alice", "missing").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_open_invalid_directory_is_distinguishable() {
        let (tmp, gw) = gateway();
        let dir = tmp.path().join("alice").join("junk.git");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("HEAD"), b"not a ref\n").unwrap();

        let err = gw.open("alice", "junk").unwrap_err();
        assert!(matches!(err, StoreError::NotARepository(_)));
    }

    #[test]
    fn test_exists_and_remove() {
        let (_tmp, gw) = gateway();
        assert!(!gw.exists("alice", "widget").unwrap());

        gw.create("alice", "widget", Visibility::Public, "main").unwrap();
        assert!(gw.exists("alice", "widget").unwrap());

        gw.remove("alice", "widget").unwrap();
        assert!(!gw.exists("alice", "widget").unwrap());
        assert!(matches!(
            gw.remove("alice", "widget"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_key_never_touches_disk() {
        let (tmp, gw) = gateway();
        assert!(matches!(
            gw.create("..", "widget", Visibility::Public, "main"),
            Err(StoreError::InvalidName(_))
        ));
        assert!(matches!(
            gw.open("alice", "../other"),
            Err(StoreError::InvalidName(_))
        ));
        // Nothing was created under the root.
        assert!(std::fs::read_dir(tmp.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_default_branch_follows_initial_head() {
        let (_tmp, gw) = gateway();
        let handle = gw
            .create("alice", "trunked", Visibility::Public, "trunk")
            .unwrap();
        assert_eq!(handle.default_branch().as_deref(), Some("trunk"));
    }
}
