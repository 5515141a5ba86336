//! The pre-receive gate wiring reviews into the push path.

use crate::client::Reviewer;
use crate::diff::patch_for_update;
use crate::language::detect_language;
use crate::verdict::{ReviewVerdict, Severity};
use crate::Result;
use berth_git::{PreReceive, RefUpdate, UpdateKind};
use git2::Repository;

/// Pre-receive hook that rejects commands whose review finds issues at or
/// above a severity threshold.
///
/// Deletes carry no new content and skip review. A failed review call
/// rejects the command with a diagnostic reason; pushes are never waved
/// through because the reviewer was down.
pub struct ReviewHook<R> {
    reviewer: R,
    threshold: Severity,
}

impl<R: Reviewer> ReviewHook<R> {
    /// A hook blocking at [`Severity::High`] and above.
    pub fn new(reviewer: R) -> Self {
        Self::with_threshold(reviewer, Severity::High)
    }

    /// A hook blocking at the given severity and above.
    pub fn with_threshold(reviewer: R, threshold: Severity) -> Self {
        Self {
            reviewer,
            threshold,
        }
    }

    fn verdict_for(&self, repo: &Repository, command: &RefUpdate) -> Result<ReviewVerdict> {
        let patch = patch_for_update(repo, command.old_id, command.new_id)?;
        let language = detect_language(&patch);
        tracing::debug!(
            ref_name = %command.ref_name,
            language = %language,
            patch_bytes = patch.len(),
            "submitting push for review"
        );
        self.reviewer.review(&patch, &language)
    }
}

impl<R: Reviewer> PreReceive for ReviewHook<R> {
    fn pre_receive(&self, repo: &Repository, commands: &mut [RefUpdate]) {
        for command in commands.iter_mut() {
            if !command.is_pending() || command.kind() == UpdateKind::Delete {
                continue;
            }
            match self.verdict_for(repo, command) {
                Ok(verdict) => {
                    if verdict.has_blocking_issues(self.threshold) {
                        tracing::info!(
                            ref_name = %command.ref_name,
                            blocking = verdict.blocking_issues(self.threshold).count(),
                            "review rejected push"
                        );
                        command.reject(format!("code review failed: {}", verdict.summary));
                    }
                }
                Err(e) => {
                    tracing::warn!(ref_name = %command.ref_name, error = %e, "review unavailable");
                    command.reject(format!("code review unavailable: {}", e));
                }
            }
        }
    }
}

// ==================== Tests ====================
