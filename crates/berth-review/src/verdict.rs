//! Review verdicts: what the reviewer says about a push.

use serde::{Deserialize, Serialize};

/// How bad an issue is. Ordering follows declaration: `Low < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Nitpick territory.
    Low,
    /// Worth fixing, not worth blocking.
    Medium,
    /// Likely bug or security concern.
    High,
    /// Must not land.
    Critical,
}

impl Severity {
    /// The lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding in a reviewed diff.
///
/// Severity is the one field the reviewer must supply; a response missing it
/// fails verdict parsing as a whole. Everything else is best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewIssue {
    /// Severity of the finding.
    pub severity: Severity,
    /// Human-readable description.
    #[serde(default)]
    pub message: String,
    /// File the finding refers to, when the reviewer named one.
    #[serde(default, alias = "fileName", skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Line within the file, when the reviewer named one.
    #[serde(default, alias = "lineNumber", skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Finding category (bug, style, performance, security).
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Suggested fix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ReviewIssue {
    /// Creates an issue with just severity and message.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            file: None,
            line: None,
            category: None,
            suggestion: None,
        }
    }
}

/// The reviewer's answer for one diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewVerdict {
    /// Overall feedback in prose.
    #[serde(default)]
    pub summary: String,
    /// Score on a 1-10 scale, 0.0 when the reviewer gave none.
    #[serde(default, alias = "overallScore", alias = "overall_score")]
    pub score: f64,
    /// Whether the reviewer would approve the change as a whole.
    #[serde(default)]
    pub approved: bool,
    /// Individual findings.
    #[serde(default)]
    pub issues: Vec<ReviewIssue>,
}

impl ReviewVerdict {
    /// A verdict standing in for a response that could not be parsed.
    ///
    /// Carries one critical issue so that every severity gate blocks it.
    pub fn parse_failure(reason: impl std::fmt::Display) -> Self {
        Self {
            summary: format!("failed to parse review response: {}", reason),
            score: 0.0,
            approved: false,
            issues: vec![ReviewIssue {
                severity: Severity::Critical,
                message: "response parsing error".to_string(),
                file: None,
                line: None,
                category: Some("system".to_string()),
                suggestion: Some("check response format".to_string()),
            }],
        }
    }

    /// Findings at or above the given severity.
    pub fn blocking_issues(&self, threshold: Severity) -> impl Iterator<Item = &ReviewIssue> {
        self.issues.iter().filter(move |i| i.severity >= threshold)
    }

    /// Whether any finding reaches the given severity.
    pub fn has_blocking_issues(&self, threshold: Severity) -> bool {
        self.blocking_issues(threshold).next().is_some()
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_severity_wire_names_round_trip() {
        for severity in [
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ] {
            let json = serde_json::to_string(&severity).unwrap();
            assert_eq!(json, format!("\"{}\"", severity.as_str()));
            let back: Severity = serde_json::from_str(&json).unwrap();
            assert_eq!(back, severity);
        }
    }

    #[test]
    fn test_issue_field_aliases() {
        let issue: ReviewIssue = serde_json::from_str(
            r#"{"severity":"high","message":"m","fileName":"src/main.rs","lineNumber":7,"type":"bug"}"#,
        )
        .unwrap();
        assert_eq!(issue.file.as_deref(), Some("src/main.rs"));
        assert_eq!(issue.line, Some(7));
        assert_eq!(issue.category.as_deref(), Some("bug"));
    }

    #[test]
    fn test_issue_without_severity_fails_to_parse() {
        let result: std::result::Result<ReviewIssue, _> =
            serde_json::from_str(r#"{"message":"no severity here"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_verdict_defaults() {
        let verdict: ReviewVerdict = serde_json::from_str("{}").unwrap();
        assert_eq!(verdict.summary, "");
        assert_eq!(verdict.score, 0.0);
        assert!(!verdict.approved);
        assert!(verdict.issues.is_empty());
    }

    #[test]
    fn test_blocking_issue_threshold() {
        let verdict = ReviewVerdict {
            summary: "mixed".to_string(),
            score: 6.0,
            approved: false,
            issues: vec![
                ReviewIssue::new(Severity::Low, "naming"),
                ReviewIssue::new(Severity::Medium, "missing test"),
                ReviewIssue::new(Severity::High, "sql injection"),
            ],
        };
        assert!(verdict.has_blocking_issues(Severity::High));
        assert!(!verdict.has_blocking_issues(Severity::Critical));
        assert_eq!(verdict.blocking_issues(Severity::Medium).count(), 2);
    }

    #[test]
    fn test_parse_failure_blocks_every_threshold() {
        let verdict = ReviewVerdict::parse_failure("unexpected token");
        assert!(!verdict.approved);
        assert!(verdict.has_blocking_issues(Severity::Critical));
        assert!(verdict.summary.contains("unexpected token"));
    }
}
