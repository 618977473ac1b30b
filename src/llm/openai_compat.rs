//! OpenAI-compatible wire format: messages with an optional inline system
//! role (spec.md §4.3).

use super::http_utils::{create_http_client, extract_text_content, send_json_request};
use super::{ChatOptions, ChatResponse, LlmError, LlmProvider, Message, Role};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};

/// Speaks the OpenAI chat-completions API shape (also used by Groq,
/// OpenRouter, and most self-hosted gateways).
pub struct OpenAiCompatProvider {
    client: HttpClient,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl OpenAiCompatProvider {
    /// Build a provider targeting `base_url` with `api_key`.
    #[must_use]
    pub fn new(api_key: String, base_url: String, default_model: String) -> Self {
        Self {
            client: create_http_client(),
            api_key,
            base_url,
            default_model,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        let model = options.model.clone().unwrap_or_else(|| self.default_model.clone());
        let max_tokens = options.max_tokens.unwrap_or(crate::config::LLM_DEFAULT_MAX_TOKENS);
        let temperature = options.temperature.unwrap_or(crate::config::LLM_DEFAULT_TEMPERATURE);

        let mut wire_messages: Vec<Value> = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = &options.system {
            wire_messages.push(json!({ "role": "system", "content": system }));
        }
        wire_messages.extend(messages.iter().map(|m| {
            json!({
                "role": match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                },
                "content": m.content,
            })
        }));

        let body = json!({
            "model": model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": wire_messages,
        });

        let auth = format!("Bearer {}", self.api_key);
        let response = send_json_request(&self.client, &self.base_url, &body, Some(&auth), &[]).await?;

        let content = extract_text_content(&response, &["choices", "0", "message", "content"])?;
        let tokens_in = response["usage"]["prompt_tokens"].as_u64().map(|n| n as u32);
        let tokens_out = response["usage"]["completion_tokens"].as_u64().map(|n| n as u32);

        Ok(ChatResponse {
            content,
            tokens_in,
            tokens_out,
        })
    }
}
