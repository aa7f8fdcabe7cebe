//! AI provider configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// AI provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Which provider rooms stream replies from
    #[serde(default)]
    pub provider: AiProvider,

    /// Cloudflare account id
    pub account_id: Option<String>,

    /// Workers AI API token
    pub api_token: Option<String>,

    /// Model identifier passed to the run endpoint
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// AI provider type
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AiProvider {
    #[default]
    WorkersAi,
    Mock,
}

impl AiConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if Workers AI credentials are present
    pub fn has_workers_ai(&self) -> bool {
        let present = |v: &Option<String>| v.as_ref().is_some_and(|s| !s.is_empty());
        present(&self.account_id) && present(&self.api_token)
    }

    /// Validate AI configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("ai"));
        }

        if self.provider == AiProvider::WorkersAi {
            if self.account_id.as_ref().map_or(true, |s| s.is_empty()) {
                return Err(ValidationError::MissingRequired("AI__ACCOUNT_ID"));
            }
            if self.api_token.as_ref().map_or(true, |s| s.is_empty()) {
                return Err(ValidationError::MissingRequired("AI__API_TOKEN"));
            }
            if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
                return Err(ValidationError::InvalidUrl {
                    field: "ai.base_url",
                    value: self.base_url.clone(),
                });
            }
        }

        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::default(),
            account_id: None,
            api_token: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "@cf/meta/llama-2-7b-chat-int8".to_string()
}

fn default_base_url() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

fn default_timeout() -> u64 {
    120
}
