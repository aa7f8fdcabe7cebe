//! Mock AI Provider for testing and offline development.
//!
//! Provides a configurable mock implementation of the AIProvider port,
//! allowing rooms to stream replies without calling a real model.
//!
//! # Features
//!
//! - Pre-configured replies, streamed fragment by fragment
//! - Error injection before or during the stream
//! - Simulated delays
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_fragments(["Hel", "lo"])
//!     .with_delay(Duration::from_millis(10));
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, AIProvider, ChatCompletionRequest, CompletionStream, ProviderInfo, StreamEvent,
};

/// Mock AI provider.
#[derive(Debug, Clone)]
pub struct MockAIProvider {
    /// Pre-configured responses (consumed in order).
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    info: ProviderInfo,
    /// Simulated latency before the stream starts and between fragments.
    delay: Duration,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<ChatCompletionRequest>>>,
}

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Stream these fragments, then the `Done` sentinel.
    Stream(Vec<String>),
    /// Stream these fragments and end without a sentinel.
    Truncated(Vec<String>),
    /// Stream these fragments, then fail.
    FailMidStream {
        fragments: Vec<String>,
        error: MockError,
    },
    /// Fail before any event is produced.
    Error(MockError),
}

/// Mock error types for testing error handling.
#[derive(Debug, Clone)]
pub enum MockError {
    RateLimited { retry_after_secs: u32 },
    Unavailable { message: String },
    AuthenticationFailed,
    Network { message: String },
    Timeout { timeout_secs: u32 },
}

impl From<MockError> for AIError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::RateLimited { retry_after_secs } => AIError::rate_limited(retry_after_secs),
            MockError::Unavailable { message } => AIError::unavailable(message),
            MockError::AuthenticationFailed => AIError::AuthenticationFailed,
            MockError::Network { message } => AIError::network(message),
            MockError::Timeout { timeout_secs } => AIError::Timeout { timeout_secs },
        }
    }
}

impl Default for MockAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAIProvider {
    /// Creates a new mock provider with default settings.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            info: ProviderInfo::new("mock", "mock-model-1"),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues a reply streamed word by word.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        let content = content.into();
        let fragments = split_words(&content);
        self.with_mock_response(MockResponse::Stream(fragments))
    }

    /// Queues a reply streamed as exactly these fragments.
    pub fn with_fragments<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = fragments.into_iter().map(Into::into).collect();
        self.with_mock_response(MockResponse::Stream(fragments))
    }

    /// Queues an error returned before streaming starts.
    pub fn with_error(self, error: MockError) -> Self {
        self.with_mock_response(MockResponse::Error(error))
    }

    /// Queues any configured response.
    pub fn with_mock_response(self, response: MockResponse) -> Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Sets simulated latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the number of calls made to this provider.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Returns all recorded calls.
    pub fn get_calls(&self) -> Vec<ChatCompletionRequest> {
        lock(&self.calls).clone()
    }

    fn next_response(&self) -> MockResponse {
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| MockResponse::Stream(split_words("Mock response")))
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn stream_chat(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<CompletionStream, AIError> {
        lock(&self.calls).push(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let (fragments, tail): (Vec<String>, Option<Result<StreamEvent, AIError>>) =
            match self.next_response() {
                MockResponse::Stream(fragments) => (fragments, Some(Ok(StreamEvent::Done))),
                MockResponse::Truncated(fragments) => (fragments, None),
                MockResponse::FailMidStream { fragments, error } => {
                    (fragments, Some(Err(error.into())))
                }
                MockResponse::Error(error) => return Err(error.into()),
            };

        let delay = self.delay;
        let events = fragments
            .into_iter()
            .map(|f| Ok(StreamEvent::Delta(f)))
            .chain(tail);

        let stream = stream::iter(events).then(move |event| async move {
            if !delay.is_zero() {
                sleep(delay / 10).await;
            }
            event
        });

        Ok(Box::pin(stream))
    }

    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }
}

/// Splits text into word fragments that concatenate back to the original.
fn split_words(content: &str) -> Vec<String> {
    content
        .split_inclusive(' ')
        .map(str::to_string)
        .collect()
}

/// Locks a mock's shared state. A poisoned lock only means another test
/// thread panicked, so the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
