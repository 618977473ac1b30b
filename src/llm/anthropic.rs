//! Anthropic-style wire format: messages + separate system prompt +
//! `max_tokens` (spec.md §4.3).

use super::http_utils::{create_http_client, extract_text_content, send_json_request};
use super::{ChatOptions, ChatResponse, LlmError, LlmProvider, Message, Role};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};

/// Speaks the Anthropic Messages API shape.
pub struct AnthropicProvider {
    client: HttpClient,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl AnthropicProvider {
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
impl LlmProvider for AnthropicProvider {
    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        let model = options.model.clone().unwrap_or_else(|| self.default_model.clone());
        let max_tokens = options.max_tokens.unwrap_or(crate::config::LLM_DEFAULT_MAX_TOKENS);
        let temperature = options.temperature.unwrap_or(crate::config::LLM_DEFAULT_TEMPERATURE);

        let system = options.system.clone().or_else(|| {
            messages
                .iter()
                .find(|m| m.role == Role::System)
                .map(|m| m.content.clone())
        });

        let wire_messages: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                json!({
                    "role": match m.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                        Role::System => unreachable!("filtered above"),
                    },
                    "content": m.content,
                })
            })
            .collect();

        let mut body = json!({
            "model": model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": wire_messages,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }

        let response = send_json_request(
            &self.client,
            &self.base_url,
            &body,
            None,
            &[
                ("x-api-key", self.api_key.as_str()),
                ("anthropic-version", "2023-06-01"),
                ("content-type", "application/json"),
            ],
        )
        .await?;

        let content = extract_text_content(&response, &["content", "0", "text"])?;
        let tokens_in = response["usage"]["input_tokens"].as_u64().map(|n| n as u32);
        let tokens_out = response["usage"]["output_tokens"].as_u64().map(|n| n as u32);

        Ok(ChatResponse {
            content,
            tokens_in,
            tokens_out,
        })
    }
}
