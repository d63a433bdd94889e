//! Completion service: one prompt in, one displayable string out.
//!
//! DESIGN
//! ======
//! Every call sends the fixed LawAssist system instruction plus a single
//! user turn. No history is forwarded to the model. Failures never cross
//! this boundary: transport, status and parse errors are rendered as text
//! and returned exactly like a normal reply, so the session shows them as
//! an ordinary assistant message.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::llm::LlmChat;
use crate::llm::types::{LlmError, Message};

/// Reply used when the endpoint answers with an empty choice list.
pub const NO_RESPONSE: &str = "No response from AI.";

pub const SYSTEM_PROMPT: &str = "\
You are LawAssist, an AI assistant that provides quick, clear, and easy-to-understand answers about laws and government schemes and accessibility services in India.
- Keep responses under 50 words.
- Prioritize clarity and efficiency.
- Mention key schemes like Ayushman Bharat and Sugamya Bharat Abhiyan.
- Ensure responses are actionable and useful for Indian users.
- Use simple language, avoiding unnecessary details.
- If the user makes a spelling mistake, assume the correct spelling and respond accordingly.";

// =============================================================================
// COMPLETER TRAIT
// =============================================================================

/// Single-attempt prompt completion that always resolves to text.
#[async_trait::async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str) -> String;
}

// =============================================================================
// SERVICE
// =============================================================================

pub struct CompletionService {
    llm: Option<Arc<dyn LlmChat>>,
    /// Env var named in the "not configured" reply.
    key_var: String,
}

impl CompletionService {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmChat>) -> Self {
        Self { llm: Some(llm), key_var: String::new() }
    }

    /// A service with no transport. Every completion explains how to configure one.
    #[must_use]
    pub fn unconfigured(key_var: impl Into<String>) -> Self {
        Self { llm: None, key_var: key_var.into() }
    }
}

#[async_trait::async_trait]
impl Completer for CompletionService {
    async fn complete(&self, prompt: &str) -> String {
        let Some(llm) = &self.llm else {
            warn!("completion requested without a configured LLM");
            return format!("An error occurred: AI is not configured (set {})", self.key_var);
        };

        info!(prompt_len = prompt.len(), "completion: request");
        let messages = [Message::system(SYSTEM_PROMPT), Message::user(prompt)];
        match llm.chat(&messages).await {
            Ok(response) => {
                info!(
                    model = %response.model,
                    finish_reason = %response.finish_reason,
                    prompt_tokens = response.prompt_tokens,
                    completion_tokens = response.completion_tokens,
                    "completion: response"
                );
                response
                    .content
                    .unwrap_or_else(|| NO_RESPONSE.to_string())
            }
            Err(e) => {
                error!(error = %e, code = e.error_code(), "completion failed");
                describe_failure(&e)
            }
        }
    }
}

/// Render a transport failure as the text shown in the transcript.
#[must_use]
pub fn describe_failure(err: &LlmError) -> String {
    match err {
        LlmError::ApiResponse { status, .. } => format!("Error: HTTP {status}"),
        other => format!("An error occurred: {other}"),
    }
}

#[cfg(test)]
#[path = "completion_test.rs"]
mod tests;
