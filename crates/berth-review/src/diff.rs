//! Patch rendering for ref-update commands.

use crate::Result;
use git2::{DiffFormat, Oid, Repository, Tree};

/// Renders the unified patch a ref-update command introduces.
///
/// A zero `old_id` means the ref is being born; the patch is taken against
/// the empty tree so every line of the new history shows up as an addition.
/// Ids are peeled, so annotated tags review the commit they point at.
pub fn patch_for_update(repo: &Repository, old_id: Oid, new_id: Oid) -> Result<String> {
    let new_tree = tree_of(repo, new_id)?;
    let old_tree = if old_id.is_zero() {
        None
    } else {
        Some(tree_of(repo, old_id)?)
    };

    let diff = repo.diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), None)?;
    let mut rendered = Vec::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        match line.origin() {
            '+' | '-' | ' ' => rendered.push(line.origin() as u8),
            _ => {}
        }
        rendered.extend_from_slice(line.content());
        true
    })?;

    Ok(String::from_utf8_lossy(&rendered).into_owned())
}

fn tree_of(repo: &Repository, id: Oid) -> Result<Tree<'_>> {
    let commit = repo.find_object(id, None)?.peel_to_commit()?;
    Ok(commit.tree()?)
}
