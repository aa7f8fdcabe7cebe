//! Room session - the per-conversation relay.
//!
//! One session serves every connection attached to a conversation id. It
//! owns the authoritative message history for the room and drives the AI
//! reply loop:
//!
//! ```text
//! client ──add──▶ session ──raw relay──▶ every connection
//!                    │
//!                    ├─ append to history
//!                    ├─ broadcast placeholder `add` ("...")
//!                    ├─ stream reply ──▶ `update` "<text>..." per fragment
//!                    ├─ finalize placeholder, save history
//!                    └─ broadcast final `update` "<text>"
//! ```
//!
//! # Concurrency
//!
//! History and hydration state sit behind one async mutex. Hydration holds
//! it across the store fetch so concurrent first connections load history
//! once; every other critical section is a plain append, replace or
//! snapshot, and the lock is never held while the AI stream or the save is
//! in flight.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::domain::chat::{
    ChatHistory, ChatMessage, ConversationId, Message, PromptMessage, COMPOSING_MARKER,
};
use crate::ports::{
    AIError, AIProvider, ChatCompletionRequest, ChatMeta, ChatStore, ChatStoreError, SaveChat,
    StreamEvent,
};

use super::connection::{ConnectionId, Outbound};

/// Final content of a reply whose stream failed before producing any text.
pub const INFERENCE_FAILED_CONTENT: &str = "(the assistant could not respond)";

/// Fixed values a room stamps onto replies and saves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSettings {
    /// User id every save is recorded under.
    pub user_id: String,
    /// Title written to the conversation metadata on save.
    pub saved_title: String,
    /// Display name of the assistant.
    pub placeholder_user: String,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            user_id: "chat-relay".to_string(),
            saved_title: "Chat history".to_string(),
            placeholder_user: "AI".to_string(),
        }
    }
}

/// Errors surfaced by room operations.
#[derive(Debug, Error)]
pub enum RoomSessionError {
    #[error("Failed to load conversation history: {0}")]
    Hydration(#[from] ChatStoreError),

    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Connection {0} is not attached to this room")]
    UnknownConnection(ConnectionId),
}

/// How an AI turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The reply completed; `persisted` is false when there was no
    /// conversation id or the save failed.
    Completed { content: String, persisted: bool },
    /// The provider failed; the placeholder holds whatever arrived.
    Failed { content: String, error: AIError },
}

#[derive(Debug, Default)]
struct RoomState {
    conversation_id: Option<ConversationId>,
    history: ChatHistory,
    hydrated: bool,
}

/// Stateful relay for one room.
pub struct RoomSession {
    room: String,
    store: Arc<dyn ChatStore>,
    ai: Arc<dyn AIProvider>,
    settings: RoomSettings,
    state: Mutex<RoomState>,
    connections: RwLock<HashMap<ConnectionId, Outbound>>,
}

impl RoomSession {
    /// Creates an empty, un-hydrated session for the named room.
    pub fn new(
        room: impl Into<String>,
        store: Arc<dyn ChatStore>,
        ai: Arc<dyn AIProvider>,
        settings: RoomSettings,
    ) -> Self {
        Self {
            room: room.into(),
            store,
            ai,
            settings,
            state: Mutex::new(RoomState::default()),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the room name this session was created for.
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Attaches a connection.
    ///
    /// The conversation id comes from the connection's request path. The
    /// first connection that carries one hydrates the history from the store;
    /// without an id the room runs with an in-memory history only. Every
    /// connection then receives an `all` snapshot before any other frame.
    ///
    /// # Errors
    ///
    /// Returns `Hydration` if the store fetch fails. The connection is not
    /// attached and the next connection retries the fetch.
    pub async fn connect(
        &self,
        request_path: &str,
        connection: ConnectionId,
        outbound: Outbound,
    ) -> Result<(), RoomSessionError> {
        let mut state = self.state.lock().await;

        if state.conversation_id.is_none() {
            state.conversation_id = ConversationId::from_request_path(request_path);
        }

        if !state.hydrated {
            if let Some(id) = state.conversation_id.clone() {
                let stored = self.store.fetch(&id).await?;
                if let Some(messages) = stored.messages {
                    tracing::debug!(
                        room = %self.room,
                        messages = messages.len(),
                        "Hydrated room history"
                    );
                    state.history.replace_all(messages);
                }
                state.hydrated = true;
            } else {
                tracing::warn!(
                    room = %self.room,
                    path = request_path,
                    "No conversation id in path, history will not be persisted"
                );
            }
        }

        let snapshot = Message::All {
            messages: state.history.snapshot(),
        };
        deliver(&outbound, &connection, serde_json::to_string(&snapshot)?);
        self.connections.write().await.insert(connection.clone(), outbound);

        tracing::info!(room = %self.room, connection_id = %connection, "Connection attached");
        Ok(())
    }

    /// Detaches a connection and returns how many remain.
    pub async fn disconnect(&self, connection: &ConnectionId) -> usize {
        let mut connections = self.connections.write().await;
        if connections.remove(connection).is_some() {
            tracing::info!(
                room = %self.room,
                connection_id = %connection,
                remaining = connections.len(),
                "Connection detached"
            );
        }
        connections.len()
    }

    /// Handles a text frame received from a connection.
    ///
    /// The raw frame is relayed to every connection first, the sender
    /// included. Then `add` appends and triggers an AI reply, `update`
    /// replaces the message with the same id, and anything else (including
    /// frames that fail to parse) leaves the history untouched.
    pub async fn on_message(&self, raw: &str, sender: &ConnectionId) -> Option<TurnOutcome> {
        self.broadcast_raw(raw, &[]).await;

        let message = match Message::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(
                    room = %self.room,
                    connection_id = %sender,
                    "Ignoring malformed frame: {}",
                    e
                );
                return None;
            }
        };

        match message {
            Message::Add(message) => Some(self.handle_add(message).await),
            Message::Update(message) => {
                self.handle_update(message).await;
                None
            }
            other => {
                tracing::debug!(
                    room = %self.room,
                    connection_id = %sender,
                    kind = other.kind(),
                    "Frame carries no state change"
                );
                None
            }
        }
    }

    /// Sends a frame to a single connection.
    ///
    /// # Errors
    ///
    /// Returns `UnknownConnection` if the connection is not attached.
    pub async fn send(
        &self,
        connection: &ConnectionId,
        message: &Message,
    ) -> Result<(), RoomSessionError> {
        let frame = serde_json::to_string(message)?;
        let connections = self.connections.read().await;
        let outbound = connections
            .get(connection)
            .ok_or_else(|| RoomSessionError::UnknownConnection(connection.clone()))?;
        deliver(outbound, connection, frame);
        Ok(())
    }

    /// Sends a frame to every attached connection not in `exclude`.
    ///
    /// Returns the number of connections the frame was handed to.
    pub async fn broadcast(
        &self,
        message: &Message,
        exclude: &[ConnectionId],
    ) -> Result<usize, RoomSessionError> {
        let frame = serde_json::to_string(message)?;
        Ok(self.broadcast_raw(&frame, exclude).await)
    }

    /// Returns a snapshot of the current history.
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.state.lock().await.history.snapshot()
    }

    /// Returns the conversation id, once known.
    pub async fn conversation_id(&self) -> Option<ConversationId> {
        self.state.lock().await.conversation_id.clone()
    }

    /// Returns the number of attached connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    async fn broadcast_raw(&self, frame: &str, exclude: &[ConnectionId]) -> usize {
        let connections = self.connections.read().await;
        let mut delivered = 0;
        for (id, outbound) in connections.iter() {
            if exclude.contains(id) {
                continue;
            }
            if deliver(outbound, id, frame.to_string()) {
                delivered += 1;
            }
        }
        delivered
    }

    async fn handle_update(&self, message: ChatMessage) {
        let replaced = self.state.lock().await.history.replace(message.clone());
        if !replaced {
            tracing::debug!(
                room = %self.room,
                message_id = %message.id,
                "Update for unknown message ignored"
            );
        }
    }

    async fn handle_add(&self, message: ChatMessage) -> TurnOutcome {
        self.state.lock().await.history.push(message);

        let placeholder = ChatMessage::placeholder(&self.settings.placeholder_user);
        self.broadcast_frame(&Message::Add(placeholder.clone())).await;

        let prompt = {
            let mut state = self.state.lock().await;
            let prompt = state.history.to_prompt();
            state.history.push(placeholder.clone());
            prompt
        };

        self.stream_reply(&placeholder, prompt).await
    }

    async fn stream_reply(
        &self,
        placeholder: &ChatMessage,
        prompt: Vec<PromptMessage>,
    ) -> TurnOutcome {
        let mut buffer = String::new();

        let mut stream = match self.ai.stream_chat(ChatCompletionRequest::new(prompt)).await {
            Ok(stream) => stream,
            Err(e) => return self.fail_turn(placeholder, buffer, e).await,
        };

        loop {
            match stream.next().await {
                Some(Ok(StreamEvent::Delta(text))) => {
                    buffer.push_str(&text);
                    let composing =
                        placeholder.with_content(format!("{}{}", buffer, COMPOSING_MARKER));
                    self.broadcast_frame(&Message::Update(composing)).await;
                }
                Some(Ok(StreamEvent::Done)) => return self.complete_turn(placeholder, buffer).await,
                Some(Err(e)) => return self.fail_turn(placeholder, buffer, e).await,
                None => {
                    tracing::warn!(
                        room = %self.room,
                        message_id = %placeholder.id,
                        "Reply stream ended without termination marker"
                    );
                    return self.complete_turn(placeholder, buffer).await;
                }
            }
        }
    }

    async fn complete_turn(&self, placeholder: &ChatMessage, content: String) -> TurnOutcome {
        let (conversation_id, messages) = {
            let mut state = self.state.lock().await;
            state.history.set_content(&placeholder.id, content.clone());
            (state.conversation_id.clone(), state.history.snapshot())
        };

        let persisted = match conversation_id {
            Some(id) => self.persist(id, messages).await,
            None => false,
        };

        self.broadcast_frame(&Message::Update(placeholder.with_content(content.clone())))
            .await;

        TurnOutcome::Completed { content, persisted }
    }

    async fn fail_turn(
        &self,
        placeholder: &ChatMessage,
        partial: String,
        error: AIError,
    ) -> TurnOutcome {
        tracing::error!(
            room = %self.room,
            message_id = %placeholder.id,
            "AI reply failed: {}",
            error
        );

        let content = if partial.is_empty() {
            INFERENCE_FAILED_CONTENT.to_string()
        } else {
            partial
        };

        self.state
            .lock()
            .await
            .history
            .set_content(&placeholder.id, content.clone());
        self.broadcast_frame(&Message::Update(placeholder.with_content(content.clone())))
            .await;

        TurnOutcome::Failed { content, error }
    }

    async fn persist(&self, id: ConversationId, messages: Vec<ChatMessage>) -> bool {
        let chat = SaveChat {
            id,
            user_id: self.settings.user_id.clone(),
            messages,
            meta: ChatMeta {
                title: self.settings.saved_title.clone(),
            },
        };

        match self.store.save(chat).await {
            Ok(ack) => {
                tracing::debug!(room = %self.room, ack = %ack, "Saved conversation");
                true
            }
            Err(e) => {
                tracing::error!(room = %self.room, "Failed to save conversation: {}", e);
                false
            }
        }
    }

    async fn broadcast_frame(&self, message: &Message) {
        if let Err(e) = self.broadcast(message, &[]).await {
            tracing::error!(room = %self.room, kind = message.kind(), "Failed to broadcast: {}", e);
        }
    }
}

/// Hands a frame to one connection's writer; a closed writer only means the
/// socket is going away.
fn deliver(outbound: &Outbound, connection: &ConnectionId, frame: String) -> bool {
    match outbound.send(frame) {
        Ok(()) => true,
        Err(_) => {
            tracing::debug!(connection_id = %connection, "Dropping frame for closed connection");
            false
        }
    }
}
