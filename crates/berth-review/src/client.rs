//! Reviewer client: the seam to the external review capability.

use crate::verdict::ReviewVerdict;
use crate::{ReviewError, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Something that can review a patch and deliver a verdict.
///
/// Implementations may fail; callers treat failure as a rejection, never as
/// an approval.
pub trait Reviewer: Send + Sync {
    /// Reviews a rendered patch in the named language.
    fn review(&self, patch: &str, language: &str) -> Result<ReviewVerdict>;
}

/// Connection settings for [`AnthropicReviewer`].
#[derive(Debug, Clone)]
pub struct ReviewerSettings {
    /// Messages endpoint URL.
    pub endpoint: String,
    /// API key sent in the `x-api-key` header.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Completion budget per review.
    pub max_tokens: u32,
    /// End-to-end timeout per review call.
    pub timeout: Duration,
}

impl ReviewerSettings {
    /// Settings with production defaults for the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            api_key: api_key.into(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4000,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Reviewer backed by an Anthropic-style messages endpoint.
///
/// The HTTP client is built on first use: blocking clients must be created
/// and driven off the async runtime, and reviews only ever run on the
/// blocking threads that serve pushes.
pub struct AnthropicReviewer {
    settings: ReviewerSettings,
    client: OnceCell<reqwest::blocking::Client>,
}

impl AnthropicReviewer {
    /// Creates a reviewer; no connection is made until the first review.
    pub fn new(settings: ReviewerSettings) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client> {
        self.client
            .get_or_try_init(|| {
                reqwest::blocking::Client::builder()
                    .timeout(self.settings.timeout)
                    .build()
            })
            .map_err(ReviewError::from)
    }
}

impl Reviewer for AnthropicReviewer {
    fn review(&self, patch: &str, language: &str) -> Result<ReviewVerdict> {
        let request = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            messages: vec![Message {
                role: "user",
                content: review_prompt(patch, language),
            }],
        };

        let response: MessagesResponse = self
            .client()?
            .post(&self.settings.endpoint)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()?
            .error_for_status()?
            .json()?;

        let text = response
            .content
            .first()
            .map(|block| block.text.as_str())
            .ok_or(ReviewError::EmptyResponse)?;

        tracing::debug!(language, response_bytes = text.len(), "review received");
        Ok(parse_verdict(text))
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

pub(crate) fn review_prompt(patch: &str, language: &str) -> String {
    format!(
        "Review this {language} code diff and report on:\n\
         1. Code quality and best practices\n\
         2. Potential bugs or security issues\n\
         3. Performance considerations\n\
         4. Maintainability suggestions\n\
         \n\
         Code diff:\n\
         ```\n\
         {patch}\n\
         ```\n\
         \n\
         Answer with JSON only, using this structure:\n\
         {{\n\
           \"summary\": \"overall feedback\",\n\
           \"score\": 1-10,\n\
           \"approved\": true|false,\n\
           \"issues\": [\n\
             {{\n\
               \"severity\": \"low|medium|high|critical\",\n\
               \"message\": \"description\",\n\
               \"file\": \"path\",\n\
               \"line\": number,\n\
               \"category\": \"bug|style|performance|security\",\n\
               \"suggestion\": \"how to fix\"\n\
             }}\n\
           ]\n\
         }}"
    )
}

/// Turns reviewer output into a verdict. Responses that fail to parse become
/// a critical parse-failure verdict rather than an error.
pub fn parse_verdict(text: &str) -> ReviewVerdict {
    let json = strip_fences(text);
    match serde_json::from_str(json) {
        Ok(verdict) => verdict,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable review response");
            ReviewVerdict::parse_failure(e)
        }
    }
}

/// Models often fence their JSON in markdown; tolerate that.
fn strip_fences(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

// ==================== Tests ====================
