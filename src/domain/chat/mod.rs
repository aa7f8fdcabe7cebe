//! Chat room domain: messages, the wire envelope and per-room history.

mod errors;
mod history;
mod ids;
mod message;

pub use errors::ValidationError;
pub use history::{ChatHistory, PromptMessage};
pub use ids::{ConversationId, MessageId};
pub use message::{ChatMessage, Message, Role, COMPOSING_MARKER};
