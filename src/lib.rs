//! Chat Relay - real-time chat rooms with streamed AI replies
//!
//! Clients connect to a room over WebSocket, see the room's history, and
//! every message they add gets an AI reply streamed back to the whole room.
//! Conversations are persisted through a chat store after each reply.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
