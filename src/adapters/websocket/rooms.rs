//! Room registry for name-based session routing.
//!
//! Rooms are keyed by the room segment of the connection URL. The first
//! connection to a room creates its [`RoomSession`]; when the last one
//! leaves, the session is dropped along with its in-memory history.
//!
//! # Architecture
//!
//! ```text
//! Room: abc            Room: xyz
//! ├── connection-a     ├── connection-d
//! ├── connection-b     └── connection-e
//! └── connection-c
//! ```
//!
//! Frames sent on room abc only reach connections a, b and c.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::application::room::{ConnectionId, RoomSession, RoomSettings};
use crate::ports::{AIProvider, ChatStore};

struct RoomEntry {
    session: Arc<RoomSession>,
    /// Connections handed this session and not yet released, including
    /// those still hydrating.
    members: usize,
}

/// Owns every live [`RoomSession`], creating and tearing them down on demand.
///
/// # Thread Safety
///
/// Membership is counted here rather than read back from the session so
/// that a connection still inside `connect` keeps its room alive. The write
/// lock is only held for map updates, never across a session call that
/// awaits I/O.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, RoomEntry>>,
    store: Arc<dyn ChatStore>,
    ai: Arc<dyn AIProvider>,
    settings: RoomSettings,
}

impl RoomRegistry {
    /// Create an empty registry whose rooms share the given adapters.
    pub fn new(store: Arc<dyn ChatStore>, ai: Arc<dyn AIProvider>, settings: RoomSettings) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            store,
            ai,
            settings,
        }
    }

    /// Reserve a place in a room for a new connection.
    ///
    /// If the room doesn't exist, it's created. Every call must be paired
    /// with a [`release`](Self::release) once the connection is gone,
    /// whether or not it managed to connect.
    pub async fn acquire(&self, room: &str) -> Arc<RoomSession> {
        let mut rooms = self.rooms.write().await;

        let entry = rooms.entry(room.to_string()).or_insert_with(|| {
            tracing::info!(room, "Creating room");
            RoomEntry {
                session: Arc::new(RoomSession::new(
                    room,
                    self.store.clone(),
                    self.ai.clone(),
                    self.settings.clone(),
                )),
                members: 0,
            }
        });

        entry.members += 1;
        entry.session.clone()
    }

    /// Detach a connection and give up its place in the room.
    ///
    /// When the last member leaves, the room is removed.
    pub async fn release(&self, room: &str, connection: &ConnectionId) {
        let session = match self.rooms.read().await.get(room) {
            Some(entry) => entry.session.clone(),
            None => return,
        };
        session.disconnect(connection).await;

        let mut rooms = self.rooms.write().await;
        if let Some(entry) = rooms.get_mut(room) {
            entry.members = entry.members.saturating_sub(1);
            if entry.members == 0 {
                rooms.remove(room);
                tracing::info!(room, "Room closed, last connection left");
            }
        }
    }

    /// Get the session for a room, if it is live.
    pub async fn get(&self, room: &str) -> Option<Arc<RoomSession>> {
        self.rooms.read().await.get(room).map(|e| e.session.clone())
    }

    /// Get the number of connections holding a place in a room.
    ///
    /// Returns 0 if the room doesn't exist.
    pub async fn member_count(&self, room: &str) -> usize {
        self.rooms.read().await.get(room).map(|e| e.members).unwrap_or(0)
    }

    /// Get all live room names (for monitoring/debugging).
    pub async fn active_rooms(&self) -> Vec<String> {
        self.rooms.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::chat_store::InMemoryChatStore;
    use crate::application::room::outbound_channel;

    fn registry() -> RoomRegistry {
        RoomRegistry::new(
            Arc::new(InMemoryChatStore::new()),
            Arc::new(MockAIProvider::new()),
            RoomSettings::default(),
        )
    }

    #[tokio::test]
    async fn acquire_creates_room_if_not_exists() {
        let registry = registry();

        let session = registry.acquire("abc").await;

        assert_eq!(session.room(), "abc");
        assert_eq!(registry.active_rooms().await, vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn acquire_returns_same_session_for_same_room() {
        let registry = registry();

        let first = registry.acquire("abc").await;
        let second = registry.acquire("abc").await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.member_count("abc").await, 2);
    }

    #[tokio::test]
    async fn different_rooms_get_separate_sessions() {
        let registry = registry();

        let abc = registry.acquire("abc").await;
        let xyz = registry.acquire("xyz").await;

        assert!(!Arc::ptr_eq(&abc, &xyz));
        let mut rooms = registry.active_rooms().await;
        rooms.sort();
        assert_eq!(rooms, vec!["abc".to_string(), "xyz".to_string()]);
    }

    #[tokio::test]
    async fn release_detaches_connection() {
        let registry = registry();
        let session = registry.acquire("abc").await;
        let _other = registry.acquire("abc").await;
        let (tx, _rx) = outbound_channel();
        let connection = ConnectionId::new();
        session.connect("/parties/chat/abc", connection.clone(), tx).await.unwrap();

        registry.release("abc", &connection).await;

        assert_eq!(session.connection_count().await, 0);
        assert_eq!(registry.member_count("abc").await, 1);
    }

    #[tokio::test]
    async fn last_release_tears_down_room() {
        let registry = registry();
        let first = registry.acquire("abc").await;
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        registry.acquire("abc").await;

        registry.release("abc", &a).await;
        assert!(registry.get("abc").await.is_some());

        registry.release("abc", &b).await;
        assert!(registry.get("abc").await.is_none());
        assert!(registry.active_rooms().await.is_empty());

        let fresh = registry.acquire("abc").await;
        assert!(!Arc::ptr_eq(&first, &fresh));
    }

    #[tokio::test]
    async fn release_of_unknown_room_is_noop() {
        let registry = registry();
        registry.release("missing", &ConnectionId::new()).await;
        assert_eq!(registry.member_count("missing").await, 0);
    }
}
