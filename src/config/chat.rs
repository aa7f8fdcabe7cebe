//! Room behaviour configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Names and titles stamped onto rooms, replies and saves
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Party segment accepted in `/parties/:party/:room`
    #[serde(default = "default_party")]
    pub party: String,

    /// Title for conversations created through `/new`
    #[serde(default = "default_new_chat_title")]
    pub new_chat_title: String,

    /// Title written on every save
    #[serde(default = "default_saved_chat_title")]
    pub saved_chat_title: String,

    /// Display name of the assistant
    #[serde(default = "default_placeholder_user")]
    pub placeholder_user: String,
}

impl ChatConfig {
    /// Validate chat configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.party.is_empty() || self.party.contains('/') {
            return Err(ValidationError::InvalidPartyName(self.party.clone()));
        }
        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            party: default_party(),
            new_chat_title: default_new_chat_title(),
            saved_chat_title: default_saved_chat_title(),
            placeholder_user: default_placeholder_user(),
        }
    }
}

fn default_party() -> String {
    "chat".to_string()
}

fn default_new_chat_title() -> String {
    "This is a new chat".to_string()
}

fn default_saved_chat_title() -> String {
    "Chat history".to_string()
}

fn default_placeholder_user() -> String {
    "AI".to_string()
}
