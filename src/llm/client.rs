//! Facade selecting a wire format at construction and exposing the single
//! `Chat` entry point (spec.md §4.3).

use super::anthropic::AnthropicProvider;
use super::openai_compat::OpenAiCompatProvider;
use super::{ChatOptions, ChatResponse, LlmError, LlmProvider, Message};
use crate::config::{LlmProviderKind, Settings};
use std::sync::Arc;
use std::time::Duration;

/// Stateless, thread-safe LLM client. One instance may be shared across
/// sessions (spec.md §4.3, §5).
#[derive(Clone)]
pub struct LlmClient {
    provider: Arc<dyn LlmProvider>,
}

impl LlmClient {
    /// Build a client from resolved settings, selecting the wire format via
    /// `settings.llm_provider_kind()`.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let api_key = settings.llm_api_key.clone().unwrap_or_default();
        let base_url = crate::config::get_llm_base_url(settings);
        let model = crate::config::get_llm_model(settings);

        let provider: Arc<dyn LlmProvider> = match settings.llm_provider_kind() {
            LlmProviderKind::Anthropic => {
                Arc::new(AnthropicProvider::new(api_key, base_url, model))
            }
            LlmProviderKind::OpenAiCompatible => {
                Arc::new(OpenAiCompatProvider::new(api_key, base_url, model))
            }
        };

        Self { provider }
    }

    /// Wrap an already-constructed provider (used by tests with a mock).
    #[must_use]
    pub fn from_provider(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Send `messages` and return the completion, with no retry (spec.md
    /// §4.3, §7). `deadline`, if set, bounds the call; exceeding it surfaces
    /// `LlmError::Timeout`.
    pub async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
        deadline: Option<Duration>,
    ) -> Result<ChatResponse, LlmError> {
        let call = self.provider.chat(messages, options);
        match deadline {
            Some(d) => tokio::time::timeout(d, call).await.map_err(|_| LlmError::Timeout)?,
            None => call.await,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::MockLlmProvider;
    use super::*;

    #[tokio::test]
    async fn chat_returns_scripted_response() -> anyhow::Result<()> {
        let client = LlmClient::from_provider(Arc::new(MockLlmProvider::new(vec!["hello"])));
        let response = client
            .chat(&[Message::user("hi")], &ChatOptions::default(), None)
            .await?;
        assert_eq!(response.content, "hello");
        Ok(())
    }

    #[tokio::test]
    async fn chat_respects_outer_deadline() {
        struct SlowProvider;
        #[async_trait::async_trait]
        impl LlmProvider for SlowProvider {
            async fn chat(
                &self,
                _messages: &[Message],
                _options: &ChatOptions,
            ) -> Result<ChatResponse, LlmError> {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(ChatResponse {
                    content: "late".to_string(),
                    tokens_in: None,
                    tokens_out: None,
                })
            }
        }

        let client = LlmClient::from_provider(Arc::new(SlowProvider));
        let result = client
            .chat(
                &[Message::user("hi")],
                &ChatOptions::default(),
                Some(Duration::from_millis(5)),
            )
            .await;
        assert!(matches!(result, Err(LlmError::Timeout)));
    }
}
