//! Personal access token records and secret handling.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, Result};

/// Length of a raw token secret in characters.
pub const SECRET_LENGTH: usize = 32;

/// Scope granted to freshly issued tokens.
pub const DEFAULT_SCOPE: &str = "repo:read,repo:write";

/// Default token lifetime.
pub const DEFAULT_TTL_DAYS: u64 = 360;

/// A personal access token row.
///
/// The raw secret never appears here; only its Argon2id hash is kept, and
/// the record is immutable after issuance except for `last_used_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Unique token id.
    pub id: u64,
    /// Owning user.
    pub username: String,
    /// User-provided display name.
    pub name: String,
    /// Argon2id hash of the secret.
    pub secret_hash: String,
    /// Scope string, e.g. `repo:read,repo:write`.
    pub scope: String,
    /// Issuance timestamp (unix seconds).
    pub created_at: u64,
    /// Expiry timestamp (unix seconds), `None` for non-expiring tokens.
    pub expires_at: Option<u64>,
    /// Last successful validation (unix seconds).
    pub last_used_at: Option<u64>,
}

impl TokenRecord {
    /// Issues a token for the user. Returns the record and the raw secret,
    /// which is shown exactly once and cannot be re-derived.
    pub fn issue(
        id: u64,
        username: impl Into<String>,
        name: impl Into<String>,
        scope: impl Into<String>,
        expires_at: Option<u64>,
    ) -> Result<(Self, String)> {
        let secret = generate_secret();
        let secret_hash = hash_secret(&secret)?;
        let record = Self {
            id,
            username: username.into(),
            name: name.into(),
            secret_hash,
            scope: scope.into(),
            created_at: crate::now_secs(),
            expires_at,
            last_used_at: None,
        };
        Ok((record, secret))
    }

    /// Verifies a raw secret against this token's hash.
    pub fn verify(&self, secret: &str) -> Result<()> {
        verify_secret(secret, &self.secret_hash)
    }

    /// Whether the token is past its expiry. Tokens without an expiry never
    /// expire; a token expiring exactly now is already expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => crate::now_secs() >= expires_at,
            None => false,
        }
    }

    /// Marks the token as just used.
    pub fn touch(&mut self) {
        self.last_used_at = Some(crate::now_secs());
    }

    /// API representation, with the raw secret attached only at issuance.
    pub fn to_response(&self, secret: Option<&str>) -> TokenResponse {
        TokenResponse {
            id: self.id,
            name: self.name.clone(),
            scope: self.scope.clone(),
            token: secret.map(|s| s.to_string()),
            created_at: self.created_at,
            expires_at: self.expires_at,
            last_used_at: self.last_used_at,
        }
    }
}

/// Token metadata as returned by the API. Never carries the hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Token id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Scope string.
    pub scope: String,
    /// The raw secret, present only in the issuance response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Issuance timestamp (unix seconds).
    pub created_at: u64,
    /// Expiry timestamp (unix seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    /// Last use timestamp (unix seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<u64>,
}

/// Generates a fresh 32-character lowercase-hex secret.
fn generate_secret() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Hashes a secret with Argon2id and a fresh salt.
fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Crypto(e.to_string()))
}

/// Verifies a secret against a stored hash.
fn verify_secret(secret: &str, hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Crypto(e.to_string()))?;
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let (record, secret) =
            TokenRecord::issue(1, "alice", "laptop", DEFAULT_SCOPE, None).unwrap();

        assert_eq!(record.username, "alice");
        assert_eq!(secret.len(), SECRET_LENGTH);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(record.verify(&secret).is_ok());
        assert!(matches!(
            record.verify("00000000000000000000000000000000"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_secret_never_stored() {
        let (record, secret) = TokenRecord::issue(1, "alice", "t", DEFAULT_SCOPE, None).unwrap();
        assert!(!record.secret_hash.contains(&secret));
        assert!(record.secret_hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_expiry() {
        let now = crate::now_secs();
        let (expired, _) =
            TokenRecord::issue(1, "alice", "old", DEFAULT_SCOPE, Some(now - 1)).unwrap();
        assert!(expired.is_expired());

        // Expiring exactly now counts as expired.
        let (boundary, _) =
            TokenRecord::issue(2, "alice", "edge", DEFAULT_SCOPE, Some(now)).unwrap();
        assert!(boundary.is_expired());

        let (live, _) =
            TokenRecord::issue(3, "alice", "new", DEFAULT_SCOPE, Some(now + 3600)).unwrap();
        assert!(!live.is_expired());

        let (forever, _) = TokenRecord::issue(4, "alice", "keep", DEFAULT_SCOPE, None).unwrap();
        assert!(!forever.is_expired());
    }

    #[test]
    fn test_response_hides_hash() {
        let (record, secret) = TokenRecord::issue(1, "alice", "t", DEFAULT_SCOPE, None).unwrap();

        let issued = record.to_response(Some(&secret));
        assert_eq!(issued.token.as_deref(), Some(secret.as_str()));

        let listed = record.to_response(None);
        assert!(listed.token.is_none());
        let json = serde_json::to_string(&listed).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("token\""));
    }

    #[test]
    fn test_touch() {
        let (mut record, _) = TokenRecord::issue(1, "alice", "t", DEFAULT_SCOPE, None).unwrap();
        assert!(record.last_used_at.is_none());
        record.touch();
        assert!(record.last_used_at.is_some());
    }
}
