//! Pre-receive code review for berth.
//!
//! Every create or update command in a push is rendered as a unified patch,
//! classified by dominant language, and submitted to an external reviewer.
//! Findings at or above a severity threshold reject the command; reviewer
//! failures reject too. The only way content lands unreviewed is a delete,
//! which has no content.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod diff;
mod error;
mod hook;
mod language;
mod verdict;

#[cfg(test)]
mod testutil;

pub use client::{AnthropicReviewer, Reviewer, ReviewerSettings};
pub use diff::patch_for_update;
pub use error::{ReviewError, Result};
pub use hook::ReviewHook;
pub use language::detect_language;
pub use verdict::{ReviewIssue, ReviewVerdict, Severity};
