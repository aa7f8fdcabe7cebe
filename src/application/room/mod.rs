//! Room sessions.
//!
//! A room is the unit of fan-out: every connection opened on the same room
//! path shares one [`RoomSession`], one history and one conversation id.

mod connection;
mod session;

pub use connection::{outbound_channel, ConnectionId, Outbound};
pub use session::{
    RoomSession, RoomSessionError, RoomSettings, TurnOutcome, INFERENCE_FAILED_CONTENT,
};
