//! Chat store configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Chat store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Where conversations are persisted
    #[serde(default)]
    pub backend: StoreBackend,

    /// Base URL of the chat persistence API
    pub base_url: Option<String>,

    /// Bearer API key for the persistence API
    pub api_key: Option<String>,

    /// Project every conversation belongs to
    pub project_id: Option<String>,

    /// User id recorded on every request
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Chat store backend
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Http,
    Memory,
}

impl StoreConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate store configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("store"));
        }
        if self.user_id.is_empty() {
            return Err(ValidationError::MissingRequired("STORE__USER_ID"));
        }
        if self.backend == StoreBackend::Memory {
            return Ok(());
        }

        let base_url = required(&self.base_url, "STORE__BASE_URL")?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ValidationError::InvalidUrl {
                field: "store.base_url",
                value: base_url.to_string(),
            });
        }
        required(&self.api_key, "STORE__API_KEY")?;
        required(&self.project_id, "STORE__PROJECT_ID")?;
        Ok(())
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ValidationError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingRequired(name)),
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            base_url: None,
            api_key: None,
            project_id: None,
            user_id: default_user_id(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_user_id() -> String {
    "chat-relay".to_string()
}

fn default_timeout() -> u64 {
    30
}
