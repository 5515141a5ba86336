//! Node configuration.

use berth_review::Severity;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable holding the reviewer API key.
///
/// The key is deliberately not a config-file field; secrets do not belong
/// on disk next to the data directory.
pub const REVIEWER_API_KEY_ENV: &str = "BERTH_REVIEWER_API_KEY";

/// Configuration for the Berth node.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listen address.
    pub listen_addr: SocketAddr,
    /// Root directory for the on-disk object stores.
    pub data_dir: PathBuf,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (pretty, json).
    pub log_format: String,
    /// Default token lifetime in days; 0 issues non-expiring tokens.
    pub token_ttl_days: u64,
    /// Push review pipeline settings.
    pub review: ReviewConfig,
    /// Ref-update policy for pushes.
    pub receive: ReceiveConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".parse().expect("static address"),
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            token_ttl_days: berth_auth::DEFAULT_TTL_DAYS,
            review: ReviewConfig::default(),
            receive: ReceiveConfig::default(),
        }
    }
}

/// Settings for the pre-receive review pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Whether pushes are gated by the external reviewer. Requires the API
    /// key environment variable at startup.
    pub enabled: bool,
    /// Model identifier sent to the reviewer.
    pub model: String,
    /// Messages endpoint URL.
    pub endpoint: String,
    /// Completion budget per review.
    pub max_tokens: u32,
    /// End-to-end timeout per review call, in seconds.
    pub timeout_secs: u64,
    /// Minimum severity that rejects a command.
    pub threshold: Severity,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        let defaults = berth_review::ReviewerSettings::new("");
        Self {
            enabled: false,
            model: defaults.model,
            endpoint: defaults.endpoint,
            max_tokens: defaults.max_tokens,
            timeout_secs: defaults.timeout.as_secs(),
            threshold: Severity::High,
        }
    }
}

/// Ref-update policy knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReceiveConfig {
    /// Allow branch deletion over the wire.
    pub allow_deletes: bool,
    /// Allow updates whose new tip does not descend from the old tip.
    pub allow_non_fast_forward: bool,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            allow_deletes: false,
            allow_non_fast_forward: false,
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file. Missing fields take defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// The reviewer API key from the environment, if set and non-empty.
    pub fn reviewer_api_key(&self) -> Option<String> {
        std::env::var(REVIEWER_API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
    }
}
