//! OpenAI-compatible chat-completions client.
//!
//! Speaks `POST {base_url}/chat/completions` with bearer auth. Groq, OpenAI
//! and most self-hosted gateways accept this shape.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::config::{LlmTimeouts, Sampling};
use super::types::{ChatResponse, LlmError, Message};

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if the reqwest client cannot be built.
    pub fn new(api_key: String, base_url: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self { http, api_key, base_url })
    }

    /// Send one chat-completion request and parse the first choice.
    ///
    /// # Errors
    ///
    /// Transport failures and timeouts map to [`LlmError::ApiRequest`],
    /// non-200 statuses to [`LlmError::ApiResponse`], bad JSON to
    /// [`LlmError::ApiParse`].
    pub async fn chat_completions(
        &self,
        model: &str,
        sampling: Sampling,
        messages: &[Message],
    ) -> Result<ChatResponse, LlmError> {
        let body = CompletionRequest {
            model,
            messages,
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
        };
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
        if status != reqwest::StatusCode::OK {
            return Err(LlmError::ApiResponse { status: status.as_u16(), body: text });
        }
        parse_chat_completions_response(&text)
    }
}

// =============================================================================
// WIRE FORMAT
// =============================================================================

#[derive(Serialize)]
pub(crate) struct CompletionRequest<'a> {
    pub(crate) model: &'a str,
    pub(crate) messages: &'a [Message],
    pub(crate) max_tokens: u32,
    pub(crate) temperature: f32,
    pub(crate) top_p: f32,
}

/// Parse a chat-completions body. An empty `choices` array is not an error:
/// it yields `content: None` so the caller can substitute its sentinel.
pub(crate) fn parse_chat_completions_response(json_text: &str) -> Result<ChatResponse, LlmError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let model = root
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default();
    let prompt_tokens = root
        .get("usage")
        .and_then(|u| u.get("prompt_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let completion_tokens = root
        .get("usage")
        .and_then(|u| u.get("completion_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let Some(choices) = root.get("choices").and_then(Value::as_array) else {
        return Err(LlmError::ApiParse("chat_completions: missing choices".to_string()));
    };

    let first = choices.first();
    let finish_reason = first
        .and_then(|c| c.get("finish_reason"))
        .and_then(Value::as_str)
        .unwrap_or("stop")
        .to_string();
    let content = first
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    Ok(ChatResponse { content, model, finish_reason, prompt_tokens, completion_tokens })
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
