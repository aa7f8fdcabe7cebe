//! Workers AI Provider - Implementation of AIProvider for Cloudflare Workers AI.
//!
//! Calls the REST `ai/run` endpoint with `stream: true` and decodes the
//! Server-Sent Events response. Each event carries `{"response": "<text>"}`
//! and the stream ends with a `data: [DONE]` marker.
//!
//! # Configuration
//!
//! ```ignore
//! let config = WorkersAiConfig::new(account_id, api_token)
//!     .with_model("@cf/meta/llama-2-7b-chat-int8");
//!
//! let provider = WorkersAiProvider::new(config)?;
//! ```

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::chat::PromptMessage;
use crate::ports::{
    AIError, AIProvider, ChatCompletionRequest, CompletionStream, ProviderInfo, StreamEvent,
};

/// Marker payload that terminates the event stream.
const DONE_MARKER: &str = "[DONE]";

/// Configuration for the Workers AI provider.
#[derive(Debug, Clone)]
pub struct WorkersAiConfig {
    /// Cloudflare account that owns the AI binding.
    pub account_id: String,
    /// API token for authentication.
    api_token: Secret<String>,
    /// Model to run.
    pub model: String,
    /// Base URL for the API (default: https://api.cloudflare.com/client/v4).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl WorkersAiConfig {
    /// Creates a new configuration for the given account and token.
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            api_token: Secret::new(api_token.into()),
            model: "@cf/meta/llama-2-7b-chat-int8".to_string(),
            base_url: "https://api.cloudflare.com/client/v4".to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_token(&self) -> &str {
        self.api_token.expose_secret()
    }
}

/// Workers AI provider implementation.
pub struct WorkersAiProvider {
    config: WorkersAiConfig,
    client: Client,
}

impl WorkersAiProvider {
    /// Creates a new provider with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `AIError::Network` if the HTTP client cannot be built.
    pub fn new(config: WorkersAiConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Builds the run endpoint URL for the configured model.
    fn run_url(&self) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_id,
            self.config.model
        )
    }

    fn to_run_request(request: &ChatCompletionRequest) -> RunRequest<'_> {
        RunRequest {
            stream: true,
            messages: &request.messages,
        }
    }

    async fn send_streaming_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<Response, AIError> {
        self.client
            .post(self.run_url())
            .bearer_auth(self.config.api_token())
            .json(&Self::to_run_request(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AIError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    AIError::network(format!("Connection failed: {}", e))
                } else {
                    AIError::network(e.to_string())
                }
            })
    }

    /// Maps non-success statuses to errors.
    async fn handle_response_status(response: Response) -> Result<Response, AIError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 | 403 => Err(AIError::AuthenticationFailed),
            429 => Err(AIError::rate_limited(30)),
            400 => Err(AIError::InvalidRequest(error_body)),
            500..=599 => Err(AIError::unavailable(format!(
                "Server error {}: {}",
                status, error_body
            ))),
            _ => Err(AIError::network(format!(
                "Unexpected status {}: {}",
                status, error_body
            ))),
        }
    }
}

#[async_trait]
impl AIProvider for WorkersAiProvider {
    async fn stream_chat(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<CompletionStream, AIError> {
        tracing::debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            "Starting Workers AI completion"
        );

        let response = self.send_streaming_request(&request).await?;
        let response = Self::handle_response_status(response).await?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| AIError::network(format!("Stream error: {}", e))))
            .scan(SseDecoder::default(), |decoder, chunk| {
                let events = match chunk {
                    Ok(bytes) => decoder.push(&bytes),
                    Err(e) => vec![Err(e)],
                };
                future::ready(Some(events))
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("workers_ai", &self.config.model)
    }
}

/// Incremental decoder for `text/event-stream` bodies.
///
/// Network chunks can split lines (and UTF-8 sequences) anywhere, so bytes
/// are buffered until a full line is available.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feeds a chunk and returns the events completed by it.
    fn push(&mut self, bytes: &[u8]) -> Vec<Result<StreamEvent, AIError>> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = parse_sse_line(line.trim_end_matches(['\n', '\r'])) {
                events.push(event);
            }
        }
        events
    }
}

/// Parses one SSE line into an event. Comments, blank lines and empty
/// fragments yield nothing.
fn parse_sse_line(line: &str) -> Option<Result<StreamEvent, AIError>> {
    let data = line.strip_prefix("data:")?.trim_start();

    if data == DONE_MARKER {
        return Some(Ok(StreamEvent::Done));
    }
    if data.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<RunStreamChunk>(data) {
        Ok(chunk) => match chunk.response {
            Some(text) if !text.is_empty() => Some(Ok(StreamEvent::Delta(text))),
            _ => None,
        },
        Err(e) => Some(Err(AIError::parse(format!("Failed to parse SSE chunk: {}", e)))),
    }
}

// ----- Workers AI API Types -----

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    stream: bool,
    messages: &'a [PromptMessage],
}

#[derive(Debug, Deserialize)]
struct RunStreamChunk {
    response: Option<String>,
}
