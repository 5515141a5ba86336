//! Filesystem layout and name validation.

use crate::error::{Result, StoreError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Maximum length for owner and repository names.
pub const MAX_NAME_LENGTH: usize = 100;

/// Valid owner/repository name: starts alphanumeric, then alphanumeric plus
/// `._-`. Keeps every name a single, traversal-free path segment.
static NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*$").expect("static pattern"));

/// Validate a single owner or repository name segment.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return Err(StoreError::InvalidName(format!(
            "'{}' must be 1-{} characters",
            name, MAX_NAME_LENGTH
        )));
    }
    if !NAME_REGEX.is_match(name) {
        return Err(StoreError::InvalidName(format!(
            "'{}' may only contain alphanumerics, '.', '_', '-' and must start alphanumeric",
            name
        )));
    }
    Ok(())
}

/// Deterministic on-disk layout: `{root}/{owner}/{name}.git`.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    /// Creates a layout rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the bare-repository directory for (owner, name), validating
    /// both segments before any path is derived.
    pub fn repo_dir(&self, owner: &str, name: &str) -> Result<PathBuf> {
        validate_name(owner)?;
        validate_name(name)?;
        Ok(self.root.join(owner).join(format!("{}.git", name)))
    }
}
