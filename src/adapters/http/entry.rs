//! Entry router: conversation creation, room upgrades and the 404 fallback.

use std::sync::Arc;

use axum::{
    extract::{FromRef, OriginalUri, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use http::{header, StatusCode};
use tower_http::trace::TraceLayer;

use crate::adapters::websocket::{websocket_router, WebSocketState};
use crate::ports::{ChatStore, ChatStoreError};

// ════════════════════════════════════════════════════════════════════════════
// State
// ════════════════════════════════════════════════════════════════════════════

/// Shared state for every entry route.
#[derive(Clone)]
pub struct AppState {
    pub websocket: WebSocketState,
    pub store: Arc<dyn ChatStore>,
    /// Title given to conversations created through `/new`.
    pub new_chat_title: String,
}

impl AppState {
    pub fn new(
        websocket: WebSocketState,
        store: Arc<dyn ChatStore>,
        new_chat_title: impl Into<String>,
    ) -> Self {
        Self {
            websocket,
            store,
            new_chat_title: new_chat_title.into(),
        }
    }
}

impl FromRef<AppState> for WebSocketState {
    fn from_ref(state: &AppState) -> Self {
        state.websocket.clone()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Router
// ════════════════════════════════════════════════════════════════════════════

/// Builds the process's only router.
pub fn entry_router(state: AppState) -> Router {
    Router::new()
        .route("/new", get(new_chat).post(new_chat))
        .merge(websocket_router::<AppState>())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET|POST /new - Create a conversation and redirect to it
pub async fn new_chat(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, EntryError> {
    let chat = state.store.create(&state.new_chat_title).await?;
    let location = redirect_location(uri.path(), chat.id.as_str());

    tracing::info!(conversation_id = %chat.id, "Created conversation");
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Location for a freshly created conversation: the request path without
/// its `/new` segment, followed by `/?id=<id>`.
fn redirect_location(path: &str, id: &str) -> String {
    let base = path.replacen("/new", "", 1);
    format!("{}/?id={}", base.trim_end_matches('/'), id)
}

// ════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════

/// Failures surfaced by entry routes.
#[derive(Debug)]
pub enum EntryError {
    /// The chat store could not create a conversation.
    Store(ChatStoreError),
}

impl From<ChatStoreError> for EntryError {
    fn from(err: ChatStoreError) -> Self {
        EntryError::Store(err)
    }
}

impl IntoResponse for EntryError {
    fn into_response(self) -> Response {
        match self {
            EntryError::Store(err) => {
                tracing::error!("Failed to create conversation: {}", err);
                (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
            }
        }
    }
}
