//! The two smart HTTP services and their protocol-mandated metadata.

use crate::{GitError, Result};

/// Agent string advertised in capabilities.
pub const AGENT: &str = "agent=berth/0.1.0";

/// A git smart HTTP service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitService {
    /// Serves fetch/clone (`git-upload-pack`).
    UploadPack,
    /// Accepts pushes (`git-receive-pack`).
    ReceivePack,
}

impl GitService {
    /// Parses the `service` query parameter of an info/refs request.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "git-upload-pack" => Ok(Self::UploadPack),
            "git-receive-pack" => Ok(Self::ReceivePack),
            other => Err(GitError::UnsupportedService(other.to_string())),
        }
    }

    /// Wire name of the service.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UploadPack => "git-upload-pack",
            Self::ReceivePack => "git-receive-pack",
        }
    }

    /// Content type for the info/refs advertisement response.
    pub fn advertisement_content_type(&self) -> &'static str {
        match self {
            Self::UploadPack => "application/x-git-upload-pack-advertisement",
            Self::ReceivePack => "application/x-git-receive-pack-advertisement",
        }
    }

    /// Content type for the POST result response.
    pub fn result_content_type(&self) -> &'static str {
        match self {
            Self::UploadPack => "application/x-git-upload-pack-result",
            Self::ReceivePack => "application/x-git-receive-pack-result",
        }
    }

    /// Capabilities advertised for this service.
    ///
    /// Receive-pack deliberately omits `delete-refs`: branch deletion over
    /// the wire is refused by policy. Neither service advertises thin packs,
    /// so every transferred pack is self-contained.
    pub fn capabilities(&self) -> String {
        match self {
            Self::UploadPack => format!("side-band-64k ofs-delta {}", AGENT),
            Self::ReceivePack => format!("report-status side-band-64k quiet ofs-delta {}", AGENT),
        }
    }
}

impl std::fmt::Display for GitService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(
            GitService::from_name("git-upload-pack").unwrap(),
            GitService::UploadPack
        );
        assert_eq!(
            GitService::from_name("git-receive-pack").unwrap(),
            GitService::ReceivePack
        );
        assert!(matches!(
            GitService::from_name("git-archive"),
            Err(GitError::UnsupportedService(_))
        ));
    }

    #[test]
    fn test_content_types_are_protocol_mandated() {
        assert_eq!(
            GitService::UploadPack.advertisement_content_type(),
            "application/x-git-upload-pack-advertisement"
        );
        assert_eq!(
            GitService::ReceivePack.result_content_type(),
            "application/x-git-receive-pack-result"
        );
    }

    #[test]
    fn test_receive_capabilities_refuse_deletes() {
        let caps = GitService::ReceivePack.capabilities();
        assert!(caps.contains("report-status"));
        assert!(!caps.contains("delete-refs"));
    }
}
