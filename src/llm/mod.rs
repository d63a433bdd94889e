//! LLM: chat-completion transport for the assistant.
//!
//! DESIGN
//! ======
//! Configuration comes from environment variables. `LlmClient` owns the
//! model name and the fixed sampling parameters so callers only supply the
//! message list. The `LlmChat` trait is the seam the completion service
//! depends on, which keeps HTTP out of unit tests.

pub mod config;
pub mod openai;
pub mod types;

use config::{LlmConfig, Sampling};
pub use types::LlmChat;
use types::{ChatResponse, LlmError, Message};

// =============================================================================
// CLIENT
// =============================================================================

/// The production [`LlmChat`]: an HTTP client bound to one model and one
/// set of sampling parameters.
pub struct LlmClient {
    inner: openai::OpenAiClient,
    model: String,
    sampling: Sampling,
}

impl LlmClient {
    /// # Errors
    ///
    /// Fails when no API key is set or the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_config(LlmConfig::from_env()?)
    }

    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let inner = openai::OpenAiClient::new(config.api_key, config.base_url, config.timeouts)?;
        Ok(Self { inner, model: config.model, sampling: config.sampling })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl LlmChat for LlmClient {
    async fn chat(&self, messages: &[Message]) -> Result<ChatResponse, LlmError> {
        self.inner
            .chat_completions(&self.model, self.sampling, messages)
            .await
    }
}
