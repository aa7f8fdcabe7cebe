//! In-memory chat store for testing and single-process deployments.
//!
//! Conversations live in a process-local map, so nothing survives a restart.
//! Stores built with [`InMemoryChatStore::with_save_log`] also record every
//! `save` payload so tests can assert on persistence.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;

use crate::domain::chat::{ChatMessage, ConversationId};
use crate::ports::{ChatMeta, ChatStore, ChatStoreError, NewChat, SaveChat, StoredChat};

/// A stored conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    pub title: String,
    pub messages: Vec<ChatMessage>,
}

/// In-memory implementation of [`ChatStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryChatStore {
    chats: Arc<RwLock<HashMap<ConversationId, ChatRecord>>>,
    /// Only present when opted into; `new()` keeps nothing but `chats`.
    saves: Option<Arc<RwLock<Vec<SaveChat>>>>,
    fail_saves: Arc<RwLock<bool>>,
    fail_fetches: Arc<RwLock<bool>>,
}

impl InMemoryChatStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every save payload, including failed ones, for [`Self::saves`].
    pub fn with_save_log(mut self) -> Self {
        self.saves = Some(Arc::default());
        self
    }

    /// Seeds a conversation, e.g. to test hydration.
    pub async fn insert(
        &self,
        id: ConversationId,
        title: impl Into<String>,
        messages: Vec<ChatMessage>,
    ) {
        self.chats.write().await.insert(
            id,
            ChatRecord {
                title: title.into(),
                messages,
            },
        );
    }

    /// Returns the stored record for a conversation.
    pub async fn get(&self, id: &ConversationId) -> Option<ChatRecord> {
        self.chats.read().await.get(id).cloned()
    }

    /// Returns every save payload received, in order. Always empty unless the
    /// store was built with [`Self::with_save_log`].
    pub async fn saves(&self) -> Vec<SaveChat> {
        match &self.saves {
            Some(log) => log.read().await.clone(),
            None => Vec::new(),
        }
    }

    /// Makes subsequent saves fail.
    pub async fn fail_saves(&self, fail: bool) {
        *self.fail_saves.write().await = fail;
    }

    /// Makes subsequent fetches fail.
    pub async fn fail_fetches(&self, fail: bool) {
        *self.fail_fetches.write().await = fail;
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn create(&self, title: &str) -> Result<NewChat, ChatStoreError> {
        let id = ConversationId::new(uuid::Uuid::new_v4().simple().to_string())
            .map_err(|e| ChatStoreError::Decode(e.to_string()))?;

        self.insert(id.clone(), title, Vec::new()).await;
        Ok(NewChat { id })
    }

    async fn fetch(&self, id: &ConversationId) -> Result<StoredChat, ChatStoreError> {
        if *self.fail_fetches.read().await {
            return Err(ChatStoreError::Network("fetch disabled".to_string()));
        }

        let messages = self
            .chats
            .read()
            .await
            .get(id)
            .map(|record| record.messages.clone())
            .filter(|messages| !messages.is_empty());

        Ok(StoredChat { messages })
    }

    async fn save(&self, chat: SaveChat) -> Result<serde_json::Value, ChatStoreError> {
        if let Some(log) = &self.saves {
            log.write().await.push(chat.clone());
        }

        if *self.fail_saves.read().await {
            return Err(ChatStoreError::Status {
                status: 503,
                body: "save disabled".to_string(),
            });
        }

        let SaveChat {
            id,
            messages,
            meta: ChatMeta { title },
            ..
        } = chat;
        let count = messages.len();
        self.chats.write().await.insert(id.clone(), ChatRecord { title, messages });

        Ok(json!({ "id": id.as_str(), "messages": count }))
    }
}
