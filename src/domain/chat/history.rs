//! Ordered message history for a single room.

use serde::{Deserialize, Serialize};

use super::{ChatMessage, MessageId, Role};

/// The authoritative, ordered list of messages in a room.
///
/// Insertion order is conversation order. Lookups by id are linear scans and
/// the first match wins; ids are expected to be unique but duplicates are
/// tolerated rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

/// A `{role, content}` pair handed to the inference service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl ChatHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message at the end of the conversation.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Replaces the whole history, e.g. after loading from the store.
    pub fn replace_all(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }

    /// Replaces the first message with the same id, keeping its position.
    ///
    /// Returns `false` and leaves the history untouched when no message has
    /// that id.
    pub fn replace(&mut self, message: ChatMessage) -> bool {
        match self.position(&message.id) {
            Some(index) => {
                self.messages[index] = message;
                true
            }
            None => false,
        }
    }

    /// Sets the content of the first message with the given id.
    pub fn set_content(&mut self, id: &MessageId, content: impl Into<String>) -> bool {
        match self.position(id) {
            Some(index) => {
                self.messages[index].content = content.into();
                true
            }
            None => false,
        }
    }

    /// Finds the first message with the given id.
    pub fn get(&self, id: &MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Reduces the history to the role/content pairs used as a prompt.
    pub fn to_prompt(&self) -> Vec<PromptMessage> {
        self.messages
            .iter()
            .map(|m| PromptMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    /// Returns the messages in conversation order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Clones the messages out, for snapshots and persistence.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| &m.id == id)
    }
}

impl From<Vec<ChatMessage>> for ChatHistory {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }
}
