//! Authenticated principals.

use serde::{Deserialize, Serialize};

/// An authenticated identity, tagged by the chain that produced it.
///
/// Downstream code queries capabilities (`username`, `authorizes_git`),
/// never the variant itself: a route either accepts what the principal can
/// do or it does not, and neither variant inherits the other's authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// Produced by the token gate; valid only on the git transport.
    GitTransport {
        /// Authenticated username.
        username: String,
        /// Scope string of the matched token.
        scope: String,
    },
    /// Produced by the web-session boundary; valid on the web API only.
    WebSession {
        /// Authenticated username.
        username: String,
    },
}

impl Principal {
    /// A git-transport principal for the given user and token scope.
    pub fn git(username: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::GitTransport {
            username: username.into(),
            scope: scope.into(),
        }
    }

    /// A web-session principal for the given user.
    pub fn web(username: impl Into<String>) -> Self {
        Self::WebSession {
            username: username.into(),
        }
    }

    /// The authenticated username.
    pub fn username(&self) -> &str {
        match self {
            Self::GitTransport { username, .. } | Self::WebSession { username } => username,
        }
    }

    /// Whether this principal may use the git transport.
    pub fn authorizes_git(&self) -> bool {
        matches!(self, Self::GitTransport { .. })
    }

    /// Whether this principal may use the web API.
    pub fn authorizes_web(&self) -> bool {
        matches!(self, Self::WebSession { .. })
    }

    /// Token scope string, when the principal came from the token gate.
    pub fn scope(&self) -> Option<&str> {
        match self {
            Self::GitTransport { scope, .. } => Some(scope),
            Self::WebSession { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chains_do_not_cross() {
        let git = Principal::git("alice", "repo:read,repo:write");
        assert!(git.authorizes_git());
        assert!(!git.authorizes_web());
        assert_eq!(git.username(), "alice");
        assert_eq!(git.scope(), Some("repo:read,repo:write"));

        let web = Principal::web("alice");
        assert!(web.authorizes_web());
        assert!(!web.authorizes_git());
        assert_eq!(web.scope(), None);
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&Principal::git("bob", "repo:read")).unwrap();
        assert!(json.contains("\"kind\":\"git_transport\""));
        let back: Principal = serde_json::from_str(&json).unwrap();
        assert_eq!(back.username(), "bob");
    }
}
