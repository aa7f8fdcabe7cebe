//! HTTP adapters - the entry router.
//!
//! Serves `/new`, mounts the room WebSocket route and answers everything
//! else with 404.

pub mod entry;

pub use entry::{entry_router, new_chat, AppState, EntryError};
