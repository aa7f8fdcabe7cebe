//! AI Provider Adapters.
//!
//! Implementations of the AIProvider port.
//!
//! ## Available Adapters
//!
//! - `WorkersAiProvider` - Cloudflare Workers AI streaming completions
//! - `MockAIProvider` - Configurable mock for testing and offline runs

mod mock_provider;
mod workers_ai_provider;

pub use mock_provider::{MockAIProvider, MockError, MockResponse};
pub use workers_ai_provider::{WorkersAiConfig, WorkersAiProvider};
