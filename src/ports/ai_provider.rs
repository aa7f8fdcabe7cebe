//! AI Provider Port - Interface for streaming chat completions.
//!
//! Rooms hand the full conversation (reduced to role/content pairs) to the
//! provider and consume an incremental event stream: zero or more text
//! fragments followed by a single [`StreamEvent::Done`] sentinel.
//!
//! # Example
//!
//! ```ignore
//! let mut stream = provider.stream_chat(ChatCompletionRequest::new(history.to_prompt())).await?;
//! let mut buffer = String::new();
//! while let Some(event) = stream.next().await {
//!     match event? {
//!         StreamEvent::Delta(text) => buffer.push_str(&text),
//!         StreamEvent::Done => break,
//!     }
//! }
//! ```

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::domain::chat::PromptMessage;

/// Boxed stream of completion events.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, AIError>> + Send>>;

/// Port for AI/LLM provider interactions.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Starts a streaming completion over the given conversation.
    ///
    /// Errors before the first event (authentication, unreachable service)
    /// are returned directly; errors after that arrive as stream items.
    async fn stream_chat(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<CompletionStream, AIError>;

    /// Get provider information (name, model).
    fn provider_info(&self) -> ProviderInfo;
}

/// Request for a streamed chat completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletionRequest {
    /// Conversation history in order.
    pub messages: Vec<PromptMessage>,
}

impl ChatCompletionRequest {
    /// Creates a request over the given history.
    pub fn new(messages: Vec<PromptMessage>) -> Self {
        Self { messages }
    }
}

/// One event of a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Next fragment of generated text.
    Delta(String),
    /// Termination sentinel; no further events follow.
    Done,
}

impl StreamEvent {
    /// Creates a text fragment event.
    pub fn delta(text: impl Into<String>) -> Self {
        Self::Delta(text.into())
    }

    /// Returns true for the termination sentinel.
    pub fn is_done(&self) -> bool {
        matches!(self, StreamEvent::Done)
    }
}

/// Provider information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "workers_ai").
    pub name: String,
    /// Model identifier.
    pub model: String,
}

impl ProviderInfo {
    /// Creates new provider info.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }
}

/// AI provider errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AIError {
    /// Rate limited by provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// Provider is unavailable.
    #[error("provider unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Credentials rejected by the provider.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Request rejected as malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },
}

impl AIError {
    /// Creates a rate limited error.
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}
