//! Identifier value objects for chat rooms and messages.
//!
//! Both identifiers are opaque strings: conversation ids are allocated by the
//! external chat store and message ids may be generated by clients, so
//! neither is constrained to a UUID the way server-owned ids are.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Identifies a conversation (and the room that serves it).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Creates a conversation id.
    ///
    /// # Errors
    ///
    /// Returns `EmptyField` if the id is empty or whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("conversation_id"));
        }
        Ok(Self(id))
    }

    /// Extracts the conversation id from a connection request path.
    ///
    /// The id is the final non-empty path segment with any query string
    /// removed, e.g. `/parties/chat/df79?test=woop` yields `df79`.
    pub fn from_request_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/')
            .find(|segment| !segment.is_empty())
            .and_then(|segment| Self::new(segment).ok())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConversationId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Identifies a single chat message within a room's history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wraps a client-supplied id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh server-side id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod conversation_id {
        use super::*;

        #[test]
        fn rejects_empty_id() {
            assert!(ConversationId::new("").is_err());
            assert!(ConversationId::new("   ").is_err());
        }

        #[test]
        fn parses_last_segment_of_room_path() {
            let id =
                ConversationId::from_request_path("/parties/chat/df7968b702668a6d1f2a51be8c66e25d");
            assert_eq!(id.unwrap().as_str(), "df7968b702668a6d1f2a51be8c66e25d");
        }

        #[test]
        fn strips_query_string() {
            let id = ConversationId::from_request_path("/parties/chat/abc?test=woop");
            assert_eq!(id.unwrap().as_str(), "abc");
        }

        #[test]
        fn skips_trailing_slash() {
            let id = ConversationId::from_request_path("/parties/chat/abc/");
            assert_eq!(id.unwrap().as_str(), "abc");
        }

        #[test]
        fn root_path_has_no_id() {
            assert!(ConversationId::from_request_path("/").is_none());
            assert!(ConversationId::from_request_path("").is_none());
            assert!(ConversationId::from_request_path("/?id=abc").is_none());
        }

        #[test]
        fn displays_inner_value() {
            let id: ConversationId = "room-1".parse().unwrap();
            assert_eq!(format!("{}", id), "room-1");
        }
    }

    mod message_id {
        use super::*;

        #[test]
        fn generates_unique_ids() {
            assert_ne!(MessageId::generate(), MessageId::generate());
        }

        #[test]
        fn generated_id_is_compact() {
            let id = MessageId::generate();
            assert_eq!(id.as_str().len(), 32);
            assert!(!id.as_str().contains('-'));
        }

        #[test]
        fn serializes_transparently() {
            let id = MessageId::new("m1");
            assert_eq!(serde_json::to_string(&id).unwrap(), "\"m1\"");
        }
    }
}
