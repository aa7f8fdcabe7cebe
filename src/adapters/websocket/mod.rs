//! WebSocket adapters for live chat rooms.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         ws_handler                                   │
//! │   - Upgrades /parties/:party/:room                                  │
//! │   - One writer task and one reader task per socket                  │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ acquire / release
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      RoomRegistry                                    │
//! │   Room: abc            Room: xyz            Room: 42                │
//! │   ├── connection-a     ├── connection-d     └── connection-g        │
//! │   └── connection-b     └── connection-e                              │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ connect / on_message
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      RoomSession                                     │
//! │   history, hydration, AI reply streaming, persistence               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`rooms`] - Room creation and teardown keyed by room name
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod handler;
pub mod rooms;

pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use rooms::RoomRegistry;
