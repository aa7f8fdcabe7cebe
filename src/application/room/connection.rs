//! Connection handles attached to a room.

use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique identifier for a WebSocket client connection.
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new random connection ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound text frames for one connection.
///
/// Unbounded so that a slow socket never blocks delivery to the rest of the
/// room; the socket's writer task drains it.
pub type Outbound = mpsc::UnboundedSender<String>;

/// Creates the outbound channel for a new connection.
pub fn outbound_channel() -> (Outbound, mpsc::UnboundedReceiver<String>) {
    mpsc::unbounded_channel()
}
