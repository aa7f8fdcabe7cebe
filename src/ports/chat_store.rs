//! ChatStore port - Interface for the external conversation store.
//!
//! The store owns persisted conversations. Rooms only know three shapes:
//! a newly allocated id, the stored message list, and an opaque save
//! acknowledgement. Each operation is a single call with no retry or
//! caching layered on top.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::chat::{ChatMessage, ConversationId};

/// Port for creating, loading and saving conversations.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Allocates a new conversation record.
    async fn create(&self, title: &str) -> Result<NewChat, ChatStoreError>;

    /// Loads the stored message list for a conversation.
    ///
    /// A conversation with no stored messages yields `messages: None`.
    async fn fetch(&self, id: &ConversationId) -> Result<StoredChat, ChatStoreError>;

    /// Overwrites the stored message list and metadata.
    async fn save(&self, chat: SaveChat) -> Result<serde_json::Value, ChatStoreError>;
}

/// Result of `create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChat {
    pub id: ConversationId,
}

/// Result of `fetch`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredChat {
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
}

/// Metadata saved alongside the messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMeta {
    pub title: String,
}

/// Payload for `save`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveChat {
    pub id: ConversationId,
    pub user_id: String,
    pub messages: Vec<ChatMessage>,
    pub meta: ChatMeta,
}

/// Errors from the chat store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatStoreError {
    /// Credentials rejected.
    #[error("chat store rejected credentials")]
    Unauthorized,

    /// Service returned an unexpected status.
    #[error("chat store returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Transport failure.
    #[error("chat store unreachable: {0}")]
    Network(String),

    /// Response body could not be decoded.
    #[error("invalid chat store response: {0}")]
    Decode(String),
}
