//! Shared application state.

use berth_auth::TokenStore;
use berth_git::{AcceptAll, PreReceive, ReceivePolicy};
use berth_meta::MetaStore;
use berth_review::{AnthropicReviewer, ReviewHook, ReviewerSettings};
use berth_storage::StoreGateway;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Metadata catalog.
    pub meta: Arc<MetaStore>,
    /// Personal access tokens.
    pub tokens: Arc<TokenStore>,
    /// Object store gateway.
    pub gateway: StoreGateway,
    /// Pre-receive hook applied to every push.
    pub hook: Arc<dyn PreReceive>,
    /// Ref-update policy applied to every push.
    pub policy: ReceivePolicy,
    /// Default token lifetime in days; 0 issues non-expiring tokens.
    pub token_ttl_days: u64,
}

impl AppState {
    /// Builds state from configuration.
    ///
    /// Review gating requires both `review.enabled` and the API key in the
    /// environment; with either missing, pushes pass the hook unreviewed
    /// (policy checks still apply).
    pub fn from_config(config: &Config) -> Self {
        let hook: Arc<dyn PreReceive> = match (config.review.enabled, config.reviewer_api_key()) {
            (true, Some(api_key)) => {
                let settings = ReviewerSettings {
                    endpoint: config.review.endpoint.clone(),
                    api_key,
                    model: config.review.model.clone(),
                    max_tokens: config.review.max_tokens,
                    timeout: Duration::from_secs(config.review.timeout_secs),
                };
                tracing::info!(
                    model = %config.review.model,
                    threshold = %config.review.threshold,
                    "push review enabled"
                );
                Arc::new(ReviewHook::with_threshold(
                    AnthropicReviewer::new(settings),
                    config.review.threshold,
                ))
            }
            (true, None) => {
                tracing::warn!(
                    "review.enabled is set but {} is missing; pushes will not be reviewed",
                    crate::config::REVIEWER_API_KEY_ENV
                );
                Arc::new(AcceptAll)
            }
            (false, _) => Arc::new(AcceptAll),
        };

        Self {
            meta: Arc::new(MetaStore::new()),
            tokens: Arc::new(TokenStore::new()),
            gateway: StoreGateway::at(config.data_dir.clone()),
            hook,
            policy: ReceivePolicy {
                allow_creates: true,
                allow_deletes: config.receive.allow_deletes,
                allow_non_fast_forward: config.receive.allow_non_fast_forward,
            },
            token_ttl_days: config.token_ttl_days,
        }
    }

    /// State over a temporary data directory, with review disabled.
    #[cfg(test)]
    pub(crate) fn for_tests(data_dir: &std::path::Path) -> Self {
        let config = Config {
            data_dir: data_dir.to_path_buf(),
            ..Config::default()
        };
        Self::from_config(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_disabled_accepts_all() {
        let tmp = tempfile::TempDir::new().unwrap();
        let state = AppState::for_tests(tmp.path());
        assert!(state.policy.allow_creates);
        assert!(!state.policy.allow_deletes);
        assert!(!state.policy.allow_non_fast_forward);
        assert_eq!(state.token_ttl_days, 360);
    }
}
