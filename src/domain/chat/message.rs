//! Chat messages and the wire envelope exchanged over room connections.
//!
//! Every frame on the socket is a JSON object tagged by `type`:
//!
//! ```text
//! {"type":"add",    "id":"m1","content":"hi","user":"u1","role":"user"}
//! {"type":"update", "id":"m1","content":"hi","user":"u1","role":"user"}
//! {"type":"all",    "messages":[{"id":"m1","content":"hi","user":"u1","role":"user"}]}
//! ```
//!
//! Clients and server share the same envelope shapes; `all` is only ever
//! sent by the server.

use serde::{Deserialize, Serialize};

use super::{MessageId, ValidationError};

/// Content shown while the assistant is still composing.
pub const COMPOSING_MARKER: &str = "...";

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// Human participant.
    User,
    /// AI assistant.
    Assistant,
}

/// A single message in a room's conversation.
///
/// Unknown fields are ignored on read, so stored records that still carry a
/// `type` tag load cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub content: String,
    /// Display name of the author, e.g. `"AI"`.
    pub user: String,
    pub role: Role,
}

impl ChatMessage {
    /// Creates a message.
    pub fn new(
        id: impl Into<MessageId>,
        content: impl Into<String>,
        user: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            user: user.into(),
            role,
        }
    }

    /// Creates the provisional assistant reply that streamed text is merged into.
    pub fn placeholder(user: impl Into<String>) -> Self {
        Self::new(MessageId::generate(), COMPOSING_MARKER, user, Role::Assistant)
    }

    /// Returns a copy of this message with different content.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }
}

/// A frame exchanged with room connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Append a message to the conversation.
    Add(ChatMessage),

    /// Replace the message with the same id.
    Update(ChatMessage),

    /// Full history snapshot, sent once per connection on attach.
    All { messages: Vec<ChatMessage> },

    /// Any other `type`; carries no state change.
    #[serde(other)]
    Unknown,
}

impl Message {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` for invalid JSON or a known `type` whose fields
    /// are missing or mistyped.
    pub fn parse(frame: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(frame)
            .map_err(|e| ValidationError::invalid_format("frame", e.to_string()))
    }

    /// Returns the tag this frame is sent under.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Add(_) => "add",
            Message::Update(_) => "update",
            Message::All { .. } => "all",
            Message::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ChatMessage {
        ChatMessage::new("m1", "hi", "u1", Role::User)
    }

    #[test]
    fn add_serializes_flat_with_type_tag() {
        let value = serde_json::to_value(Message::Add(sample())).unwrap();
        assert_eq!(
            value,
            json!({"type": "add", "id": "m1", "content": "hi", "user": "u1", "role": "user"})
        );
    }

    #[test]
    fn all_serializes_message_list() {
        let value = serde_json::to_value(Message::All {
            messages: vec![sample()],
        })
        .unwrap();
        assert_eq!(value["type"], "all");
        assert_eq!(value["messages"][0]["id"], "m1");
        assert!(value["messages"][0].get("type").is_none());
    }

    #[test]
    fn parses_update_frame() {
        let frame = r#"{"type":"update","id":"m1","content":"edited","user":"u1","role":"user"}"#;
        let parsed = Message::parse(frame).unwrap();
        assert_eq!(parsed, Message::Update(sample().with_content("edited")));
        assert_eq!(parsed.kind(), "update");
    }

    #[test]
    fn unknown_type_parses_to_unknown() {
        let parsed = Message::parse(r#"{"type":"typing","user":"u1"}"#).unwrap();
        assert_eq!(parsed, Message::Unknown);
    }

    #[test]
    fn missing_fields_are_rejected() {
        let result = Message::parse(r#"{"type":"add","id":"m1"}"#);
        assert!(matches!(result, Err(ValidationError::InvalidFormat { .. })));
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(Message::parse("not json").is_err());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let frame = r#"{"type":"add","id":"m1","content":"hi","user":"u1","role":"robot"}"#;
        assert!(Message::parse(frame).is_err());
    }

    #[test]
    fn stored_records_with_type_tag_load_as_chat_messages() {
        let stored = json!({
            "type": "add",
            "id": "m1",
            "content": "hi",
            "user": "u1",
            "role": "user"
        });
        let message: ChatMessage = serde_json::from_value(stored).unwrap();
        assert_eq!(message, sample());
    }

    #[test]
    fn placeholder_is_composing_assistant_message() {
        let placeholder = ChatMessage::placeholder("AI");
        assert_eq!(placeholder.role, Role::Assistant);
        assert_eq!(placeholder.user, "AI");
        assert_eq!(placeholder.content, COMPOSING_MARKER);
        assert_ne!(placeholder.id, ChatMessage::placeholder("AI").id);
    }
}
