//! Chat store adapters.
//!
//! - `HttpChatStore` - Hosted conversation API over HTTP
//! - `InMemoryChatStore` - Process-local store for tests and local runs

mod http_store;
mod in_memory;

pub use http_store::{HttpChatStore, HttpChatStoreConfig};
pub use in_memory::{ChatRecord, InMemoryChatStore};
