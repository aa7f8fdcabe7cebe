//! WebSocket upgrade handler for room connections.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Check the party name and upgrade
//! 2. Reserve a place in the room and attach (hydrating if first)
//! 3. Relay frames until disconnect
//! 4. Let any in-flight AI reply finish, then release the room place
//!
//! Client frames are applied by a dispatch task that is never aborted. A
//! reply started by this connection therefore keeps streaming to the rest
//! of the room, and is saved, even if this socket drops halfway through.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        OriginalUri, Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::application::room::{outbound_channel, ConnectionId};

use super::rooms::RoomRegistry;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    /// Registry of live rooms.
    pub registry: Arc<RoomRegistry>,
    /// The only party name that accepts connections.
    pub party: String,
}

impl WebSocketState {
    /// Create a new WebSocket state.
    pub fn new(registry: Arc<RoomRegistry>, party: impl Into<String>) -> Self {
        Self {
            registry,
            party: party.into(),
        }
    }
}

/// Handle WebSocket upgrade requests for a room.
///
/// Route: `GET /parties/:party/:room`
///
/// Unknown party names answer 404 before the upgrade is considered.
pub async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Path((party, room)): Path<(String, String)>,
    OriginalUri(uri): OriginalUri,
    State(state): State<WebSocketState>,
) -> Response {
    if party != state.party {
        tracing::debug!(party = %party, "Rejecting connection for unknown party");
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let path = uri.path().to_string();
    ws.on_upgrade(move |socket| handle_socket(socket, room, path, state))
}

/// Handle an established WebSocket connection.
///
/// This function runs for the lifetime of the connection, handling:
/// - Attaching to the room (the `all` snapshot arrives first)
/// - Forwarding room frames to the client
/// - Feeding client text frames into the room
/// - Cleanup on disconnect
async fn handle_socket(socket: WebSocket, room: String, path: String, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();

    let connection_id = ConnectionId::new();
    let (outbound, mut outbound_rx) = outbound_channel();

    let session = state.registry.acquire(&room).await;

    if let Err(e) = session.connect(&path, connection_id.clone(), outbound).await {
        tracing::error!(
            room = %room,
            connection_id = %connection_id,
            "Failed to attach connection: {}",
            e
        );
        let _ = sender.send(Message::Close(None)).await;
        state.registry.release(&room, &connection_id).await;
        return;
    }

    // Forward room frames to client
    let mut send_task = {
        let connection_id = connection_id.clone();
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = sender.send(Message::Text(frame)).await {
                    tracing::debug!(
                        connection_id = %connection_id,
                        "Send error, closing connection: {}",
                        e
                    );
                    break;
                }
            }
        })
    };

    // Apply client frames to the room, one at a time, in arrival order
    let (frames, mut frames_rx) = mpsc::unbounded_channel::<String>();
    let dispatch_task = {
        let connection_id = connection_id.clone();
        let session = session.clone();
        tokio::spawn(async move {
            while let Some(text) = frames_rx.recv().await {
                session.on_message(&text, &connection_id).await;
            }
        })
    };

    // Handle incoming frames from client
    let mut recv_task = {
        let connection_id = connection_id.clone();
        tokio::spawn(async move {
            while let Some(result) = receiver.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        if frames.send(text).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Binary(_)) => {
                        tracing::warn!(
                            connection_id = %connection_id,
                            "Received unsupported binary message"
                        );
                    }
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                        // Handled by axum
                    }
                    Ok(Message::Close(_)) => {
                        tracing::debug!(connection_id = %connection_id, "Client sent close frame");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(connection_id = %connection_id, "Receive error: {}", e);
                        break;
                    }
                }
            }
        })
    };

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    // Stop delivering to this socket, but keep the room alive until frames
    // already received (and any reply they started) are fully handled.
    session.disconnect(&connection_id).await;
    if let Err(e) = dispatch_task.await {
        tracing::error!(
            room = %room,
            connection_id = %connection_id,
            "Frame dispatch task failed: {}",
            e
        );
    }

    state.registry.release(&room, &connection_id).await;
}

/// Create axum router for the room endpoint.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .merge(websocket_router())
///     .with_state(ws_state);
/// ```
pub fn websocket_router<S>() -> axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
    WebSocketState: axum::extract::FromRef<S>,
{
    use axum::routing::get;

    axum::Router::new().route("/parties/:party/:room", get(ws_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::chat_store::InMemoryChatStore;
    use crate::application::room::RoomSettings;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> WebSocketState {
        let registry = RoomRegistry::new(
            Arc::new(InMemoryChatStore::new()),
            Arc::new(MockAIProvider::new()),
            RoomSettings::default(),
        );
        WebSocketState::new(Arc::new(registry), "chat")
    }

    #[test]
    fn websocket_state_shares_registry() {
        let state = state();
        let clone = state.clone();

        assert!(Arc::ptr_eq(&state.registry, &clone.registry));
        assert_eq!(clone.party, "chat");
    }

    #[tokio::test]
    async fn unknown_party_is_not_found() {
        let app = websocket_router().with_state(state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/parties/other/abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Not Found");
    }

    #[tokio::test]
    async fn plain_get_on_room_is_rejected_without_creating_room() {
        let state = state();
        let registry = state.registry.clone();
        let app = websocket_router().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/parties/chat/abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert!(registry.active_rooms().await.is_empty());
    }
}
