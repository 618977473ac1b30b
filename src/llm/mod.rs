//! LLM client: a single `Chat(messages, options?)` call against an
//! Anthropic-style or OpenAI-compatible endpoint (spec.md §4.3).

pub mod anthropic;
pub mod client;
pub mod http_utils;
pub mod openai_compat;

pub use client::LlmClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced from an LLM provider call.
#[derive(Debug, Error, Clone)]
pub enum LlmError {
    /// The outer deadline passed before a response arrived.
    #[error("LLM call timed out")]
    Timeout,
    /// Transport-level failure (DNS, connect, TLS, broken pipe).
    #[error("network error: {0}")]
    Network(String),
    /// Non-2xx response from the provider.
    #[error("API error: {0}")]
    Api(String),
    /// Response body was not valid/expected JSON.
    #[error("JSON error: {0}")]
    Json(String),
}

/// A message role. `System` is only meaningful for providers that accept it
/// inline; the Anthropic wire format splits it out separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A prior model turn.
    Assistant,
    /// A user turn.
    User,
    /// A system instruction (OpenAI-compatible wire format only).
    System,
}

/// One turn in a `Chat` conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this turn.
    pub role: Role,
    /// Turn content.
    pub content: String,
}

impl Message {
    /// Build a user-role message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Build an assistant-role message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Optional per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Overrides the client's configured model for this call.
    pub model: Option<String>,
    /// Separate system prompt (always honored; inlined for OpenAI-compatible).
    pub system: Option<String>,
    /// Sampling temperature; defaults to the client's configured value.
    pub temperature: Option<f32>,
    /// Max tokens to generate; defaults to the client's configured value.
    pub max_tokens: Option<u32>,
}

/// The result of one `Chat` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The model's reply text.
    pub content: String,
    /// Input token count, if the provider reports it.
    pub tokens_in: Option<u32>,
    /// Output token count, if the provider reports it.
    pub tokens_out: Option<u32>,
}

/// A single-request/response chat completion provider. Implementations are
/// stateless and must be safe to share across sessions (spec.md §4.3, §5).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send `messages` and return the completion. No streaming, no retry.
    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatResponse, LlmError>;
}
