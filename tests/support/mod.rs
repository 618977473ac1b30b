//! Shared test-support helpers: a scripted LLM provider standing in for a
//! real network call (spec.md §8, mirroring the teacher's
//! `tests/llm_provider_check.rs`).

use agent_runtime_core::llm::{ChatOptions, ChatResponse, LlmError, LlmProvider, Message};
use async_trait::async_trait;
use std::sync::Mutex;

pub struct ScriptedLlmProvider {
    responses: Mutex<Vec<Result<String, LlmError>>>,
}

impl ScriptedLlmProvider {
    #[must_use]
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().rev().map(|s| Ok(s.to_string())).collect()),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlmProvider {
    async fn chat(&self, _messages: &[Message], _options: &ChatOptions) -> Result<ChatResponse, LlmError> {
        let next = {
            let mut guard = self
                .responses
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            guard
                .pop()
                .unwrap_or_else(|| Err(LlmError::Api("scripted responses exhausted".to_string())))
        };
        next.map(|content| ChatResponse {
            content,
            tokens_in: None,
            tokens_out: None,
        })
    }
}

pub fn write_skill(dir: &std::path::Path, name: &str, yaml: &str) -> anyhow::Result<()> {
    let skill_dir = dir.join(name);
    std::fs::create_dir_all(&skill_dir)?;
    std::fs::write(skill_dir.join("skill.yaml"), yaml)?;
    Ok(())
}
