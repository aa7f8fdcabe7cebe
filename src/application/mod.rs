//! Application layer - room orchestration.
//!
//! Coordinates the chat store and AI provider ports on behalf of the
//! connections attached to each room.

pub mod room;

pub use room::{
    outbound_channel, ConnectionId, Outbound, RoomSession, RoomSessionError, RoomSettings,
    TurnOutcome,
};
