//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `ai` - Workers AI and mock providers
//! - `chat_store` - HTTP and in-memory conversation stores
//! - `http` - Entry router
//! - `websocket` - Room registry and socket handler

pub mod ai;
pub mod chat_store;
pub mod http;
pub mod websocket;

pub use ai::{MockAIProvider, WorkersAiConfig, WorkersAiProvider};
pub use chat_store::{HttpChatStore, HttpChatStoreConfig, InMemoryChatStore};
pub use http::{entry_router, AppState};
pub use websocket::{RoomRegistry, WebSocketState};
