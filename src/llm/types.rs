//! LLM types: chat-completion message types and errors.
//!
//! Provider-neutral shapes shared by the HTTP client and the completion
//! service. Only plain-text turns exist here: the assistant never calls tools.

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Failures between the completion service and the chat-completions endpoint.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no API key: set {var}")]
    MissingApiKey { var: String },

    /// Connect, send or read failed. Timeouts land here too.
    #[error("completion request failed: {0}")]
    ApiRequest(String),

    #[error("completion endpoint returned HTTP {status}")]
    ApiResponse { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    ApiParse(String),

    #[error("could not build HTTP client: {0}")]
    HttpClientBuild(String),
}

impl LlmError {
    /// Grepable code used as a structured log field.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingApiKey { .. } => "E_LLM_NO_KEY",
            Self::ApiRequest(_) => "E_LLM_REQUEST",
            Self::ApiResponse { .. } => "E_LLM_STATUS",
            Self::ApiParse(_) => "E_LLM_PARSE",
            Self::HttpClientBuild(_) => "E_LLM_CLIENT",
        }
    }
}

// =============================================================================
// MESSAGE TYPES
// =============================================================================

/// A single chat turn sent to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

/// Parsed reply to one chat-completions request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    /// Text of the first choice. `None` when the endpoint returned no choices
    /// or the first choice carried no text.
    pub content: Option<String>,
    pub model: String,
    pub finish_reason: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

// =============================================================================
// LLM CHAT TRAIT
// =============================================================================

/// Async seam over the completion transport. Enables mocking in tests.
#[async_trait::async_trait]
pub trait LlmChat: Send + Sync {
    /// Send one chat-completion request.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the request fails, times out, or the
    /// response is malformed.
    async fn chat(&self, messages: &[Message]) -> Result<ChatResponse, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
