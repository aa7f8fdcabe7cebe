//! Chat relay server entry point.
//!
//! Loads configuration, initialises tracing, wires the chat store and AI
//! provider selected by configuration into the room registry, and serves the
//! entry router until interrupted.

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use chat_relay::adapters::{
    entry_router, AppState, HttpChatStore, HttpChatStoreConfig, InMemoryChatStore, MockAIProvider,
    RoomRegistry, WebSocketState, WorkersAiConfig, WorkersAiProvider,
};
use chat_relay::application::RoomSettings;
use chat_relay::config::{
    AiProvider, AppConfig, ConfigError, LogFormat, StoreBackend, ValidationError,
};
use chat_relay::ports::{AIError, AIProvider, ChatStore, ChatStoreError};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to initialise tracing: {0}")]
    Tracing(String),

    #[error("Failed to build AI provider: {0}")]
    Ai(#[from] AIError),

    #[error("Failed to build chat store: {0}")]
    Store(#[from] ChatStoreError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config)?;
    config.validate()?;

    let store = build_store(&config)?;
    let ai = build_ai(&config)?;
    let info = ai.provider_info();

    let settings = RoomSettings {
        user_id: config.store.user_id.clone(),
        saved_title: config.chat.saved_chat_title.clone(),
        placeholder_user: config.chat.placeholder_user.clone(),
    };
    let registry = Arc::new(RoomRegistry::new(store.clone(), ai, settings));
    let websocket = WebSocketState::new(registry, config.chat.party.clone());
    let app = entry_router(AppState::new(websocket, store, config.chat.new_chat_title.clone()));

    let addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        provider = %info.name,
        model = %info.model,
        store = ?config.store.backend,
        party = %config.chat.party,
        "Chat relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Chat relay stopped");
    Ok(())
}

/// JSON output in production, human-readable otherwise. `RUST_LOG` wins over
/// the configured filter.
fn init_tracing(config: &AppConfig) -> Result<(), StartupError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let result = match config.server.log_format() {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    result.map_err(|e| StartupError::Tracing(e.to_string()))
}

fn build_store(config: &AppConfig) -> Result<Arc<dyn ChatStore>, StartupError> {
    let store = &config.store;
    match store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory chat store, conversations are lost on restart");
            Ok(Arc::new(InMemoryChatStore::new()))
        }
        StoreBackend::Http => {
            let http_config = HttpChatStoreConfig::new(
                store.base_url.clone().unwrap_or_default(),
                store.api_key.clone().unwrap_or_default(),
                store.project_id.clone().unwrap_or_default(),
                store.user_id.clone(),
            )
            .with_timeout(store.timeout());
            Ok(Arc::new(HttpChatStore::new(http_config)?))
        }
    }
}

fn build_ai(config: &AppConfig) -> Result<Arc<dyn AIProvider>, StartupError> {
    let ai = &config.ai;
    match ai.provider {
        AiProvider::Mock => {
            tracing::warn!("Using mock AI provider");
            Ok(Arc::new(MockAIProvider::new()))
        }
        AiProvider::WorkersAi => {
            let workers_config = WorkersAiConfig::new(
                ai.account_id.clone().unwrap_or_default(),
                ai.api_token.clone().unwrap_or_default(),
            )
            .with_model(ai.model.clone())
            .with_base_url(ai.base_url.clone())
            .with_timeout(ai.timeout());
            Ok(Arc::new(WorkersAiProvider::new(workers_config)?))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
