//! Token storage and the validation gate.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{AuthError, Result};
use crate::principal::Principal;
use crate::token::{TokenRecord, DEFAULT_TTL_DAYS};

const SECS_PER_DAY: u64 = 86_400;

/// Thread-safe store of personal access tokens, indexed by owning user.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: RwLock<HashMap<u64, TokenRecord>>,
    user_index: RwLock<HashMap<String, Vec<u64>>>,
    next_id: AtomicU64,
}

impl TokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a token for the user. `ttl_days` of `None` applies the
    /// default lifetime; `Some(0)` issues a non-expiring token.
    ///
    /// Returns the record and the raw secret, shown exactly once.
    pub fn issue(
        &self,
        username: &str,
        name: &str,
        scope: &str,
        ttl_days: Option<u64>,
    ) -> Result<(TokenRecord, String)> {
        let expires_at = match ttl_days.unwrap_or(DEFAULT_TTL_DAYS) {
            0 => None,
            days => Some(crate::now_secs() + days * SECS_PER_DAY),
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (record, secret) = TokenRecord::issue(id, username, name, scope, expires_at)?;

        self.tokens.write().insert(id, record.clone());
        self.user_index
            .write()
            .entry(username.to_string())
            .or_default()
            .push(id);

        tracing::info!(username = %username, token_id = id, "issued access token");
        Ok((record, secret))
    }

    /// Validates (username, raw secret) and produces a git-transport
    /// principal.
    ///
    /// Succeeds if any of the user's tokens hashes to the secret and is not
    /// expired. An expired token never validates even when its hash matches,
    /// but it does not end the search: a live match elsewhere still wins.
    pub fn validate(&self, username: &str, secret: &str) -> Result<Principal> {
        let ids = self
            .user_index
            .read()
            .get(username)
            .cloned()
            .unwrap_or_default();

        // Argon2id verification takes ~100ms per candidate; it runs under
        // the read lock so concurrent validations are not serialized.
        let mut matched = None;
        let mut saw_expired = false;
        {
            let tokens = self.tokens.read();
            for id in ids {
                let Some(token) = tokens.get(&id) else {
                    continue;
                };
                if token.verify(secret).is_err() {
                    continue;
                }
                if token.is_expired() {
                    tracing::debug!(username = %username, token_id = id, "expired token presented");
                    saw_expired = true;
                    continue;
                }
                matched = Some((id, token.scope.clone()));
                break;
            }
        }

        match matched {
            Some((id, scope)) => {
                if let Some(token) = self.tokens.write().get_mut(&id) {
                    token.touch();
                }
                Ok(Principal::git(username, scope))
            }
            None if saw_expired => Err(AuthError::TokenExpired),
            None => {
                tracing::debug!(username = %username, "no token matched");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Lists a user's tokens, newest first. Metadata only.
    pub fn list_for_user(&self, username: &str) -> Vec<TokenRecord> {
        let ids = self
            .user_index
            .read()
            .get(username)
            .cloned()
            .unwrap_or_default();
        let tokens = self.tokens.read();
        let mut records: Vec<_> = ids.iter().filter_map(|id| tokens.get(id).cloned()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records
    }

    /// Revokes a token the named user owns.
    pub fn revoke(&self, username: &str, id: u64) -> Result<()> {
        let mut tokens = self.tokens.write();
        match tokens.get(&id) {
            Some(token) if token.username == username => {}
            _ => return Err(AuthError::TokenNotFound),
        }
        tokens.remove(&id);
        if let Some(ids) = self.user_index.write().get_mut(username) {
            ids.retain(|existing| *existing != id);
        }
        tracing::info!(username = %username, token_id = id, "revoked access token");
        Ok(())
    }

    /// Number of live tokens.
    pub fn count(&self) -> usize {
        self.tokens.read().len()
    }
}
