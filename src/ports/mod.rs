//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the rooms and the outside world. Adapters implement these ports.
//!
//! - `ChatStore` - External conversation persistence (create/fetch/save)
//! - `AIProvider` - Streaming chat completions

mod ai_provider;
mod chat_store;

pub use ai_provider::{
    AIError, AIProvider, ChatCompletionRequest, CompletionStream, ProviderInfo, StreamEvent,
};
pub use chat_store::{ChatMeta, ChatStore, ChatStoreError, NewChat, SaveChat, StoredChat};
