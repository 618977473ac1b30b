//! Two-phase synthesis orchestration (spec.md §4.5).

use super::prompts::{build_implement_prompt, build_plan_prompt};
use super::{GenerateOptions, Plan, PtcError, RawPlan};
use crate::llm::{ChatOptions, LlmClient, Message};
use crate::skills::SkillRegistry;
use lazy_regex::{lazy_regex, Lazy};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

static PLAN_TAG_RE: Lazy<Regex> = lazy_regex!(r"(?s)<plan>(.*?)</plan>");
static CODE_FENCE_RE: Lazy<Regex> = lazy_regex!(r"```(?:\w+)?\n([\s\S]*?)```");
static CODE_TAG_RE: Lazy<Regex> = lazy_regex!(r"(?s)<code>(.*?)</code>");

/// Orchestrates the plan → implement synthesis pipeline.
pub struct PtcGenerator {
    registry: Arc<SkillRegistry>,
    llm: LlmClient,
}

impl PtcGenerator {
    /// Build a generator bound to a registry and an LLM client.
    #[must_use]
    pub fn new(registry: Arc<SkillRegistry>, llm: LlmClient) -> Self {
        Self { registry, llm }
    }

    /// Run both phases and return the synthesized code (spec.md §4.5).
    #[instrument(skip(self, options))]
    pub async fn generate(&self, task: &str, options: GenerateOptions) -> Result<String, PtcError> {
        let mut available = self
            .registry
            .list(None)
            .await
            .map_err(|e| PtcError::Planning(e.to_string()))?;
        if let Some(allowed) = &options.available_skills {
            let allowed: std::collections::HashSet<&str> =
                allowed.iter().map(String::as_str).collect();
            available.retain(|m| allowed.contains(m.name.as_str()));
        }

        let plan = self.run_plan_phase(&available, task, &options).await?;

        let mut selected_defs = Vec::new();
        for name in &plan.selected_skills {
            match self.registry.load_full(name).await {
                Ok(def) => selected_defs.push(def),
                Err(err) => warn!(skill = %name, error = %err, "dropping unloadable planned skill"),
            }
        }

        self.run_implement_phase(&selected_defs, task, &options).await
    }

    async fn run_plan_phase(
        &self,
        available: &[crate::skills::SkillMetadata],
        task: &str,
        options: &GenerateOptions,
    ) -> Result<Plan, PtcError> {
        let prompt = build_plan_prompt(available, task, options);
        let chat_options = ChatOptions {
            model: options.model.clone(),
            ..Default::default()
        };
        let response = self
            .llm
            .chat(&[Message::user(prompt)], &chat_options, llm_deadline(options))
            .await?;

        let captured = PLAN_TAG_RE
            .captures(&response.content)
            .ok_or_else(|| PtcError::Planning("no <plan> block found in response".to_string()))?;
        let raw: RawPlan = serde_json::from_str(captured[1].trim())
            .map_err(|e| PtcError::Planning(format!("invalid plan JSON: {e}")))?;

        let known_names: std::collections::HashSet<&str> =
            available.iter().map(|m| m.name.as_str()).collect();
        let selected_skills = raw
            .selected_skills
            .into_iter()
            .filter(|name| known_names.contains(name.as_str()))
            .collect();

        Ok(Plan {
            selected_skills,
            reasoning: raw.reasoning,
        })
    }

    async fn run_implement_phase(
        &self,
        selected: &[Arc<crate::skills::SkillDefinition>],
        task: &str,
        options: &GenerateOptions,
    ) -> Result<String, PtcError> {
        let prompt = build_implement_prompt(selected, task, options);
        let chat_options = ChatOptions {
            model: options.model.clone(),
            ..Default::default()
        };
        let response = self
            .llm
            .chat(&[Message::user(prompt)], &chat_options, llm_deadline(options))
            .await?;

        extract_code(&response.content)
    }
}

/// `0` means "no deadline" (spec.md §7 `Timeout` is opt-in per call site).
fn llm_deadline(options: &GenerateOptions) -> Option<Duration> {
    (options.llm_timeout_ms > 0).then(|| Duration::from_millis(options.llm_timeout_ms))
}

/// Extract generated code: fenced blocks first, then `<code>...</code>`
/// (spec.md §9 resolves the source's undocumented precedence this way).
pub(crate) fn extract_code(text: &str) -> Result<String, PtcError> {
    if let Some(captures) = CODE_FENCE_RE.captures(text) {
        return Ok(captures[1].trim_end().to_string());
    }
    if let Some(captures) = CODE_TAG_RE.captures(text) {
        return Ok(captures[1].trim().to_string());
    }
    Err(PtcError::Synthesis(
        "no fenced code block or <code> block found in response".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatOptions as LlmChatOptions, ChatResponse, LlmError, LlmProvider, Message as LlmMessage};
    use async_trait::async_trait;

    struct SlowProvider;

    #[async_trait]
    impl LlmProvider for SlowProvider {
        async fn chat(
            &self,
            _messages: &[LlmMessage],
            _options: &LlmChatOptions,
        ) -> Result<ChatResponse, LlmError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(ChatResponse {
                content: "<plan>{\"selected_skills\":[],\"reasoning\":\"n/a\"}</plan>".to_string(),
                tokens_in: None,
                tokens_out: None,
            })
        }
    }

    #[tokio::test]
    async fn generate_surfaces_llm_timeout_when_plan_phase_exceeds_deadline() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let registry = Arc::new(SkillRegistry::new(tmp.path().to_path_buf()));
        let llm = LlmClient::from_provider(Arc::new(SlowProvider));
        let generator = PtcGenerator::new(registry, llm);

        let options = GenerateOptions {
            llm_timeout_ms: 5,
            ..Default::default()
        };
        match generator.generate("do something", options).await {
            Err(PtcError::Llm(LlmError::Timeout)) => {}
            other => anyhow::bail!("expected Llm(Timeout), got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn extract_code_prefers_fenced_block_over_code_tag() -> anyhow::Result<()> {
        let text = "<code>wrong</code>\n```python\nprint(1)\n```";
        assert_eq!(extract_code(text)?, "print(1)");
        Ok(())
    }

    #[test]
    fn extract_code_falls_back_to_code_tag() -> anyhow::Result<()> {
        let text = "here: <code>print(2)</code>";
        assert_eq!(extract_code(text)?, "print(2)");
        Ok(())
    }

    #[test]
    fn extract_code_errors_when_neither_present() {
        assert!(extract_code("no code here").is_err());
    }

    #[test]
    fn extract_code_handles_multiline_fenced_block() -> anyhow::Result<()> {
        let text = "```python\nr = await executor.execute('x', {})\nprint(r)\n```";
        let code = extract_code(text)?;
        assert!(code.contains("executor.execute"));
        assert!(code.contains("print(r)"));
        Ok(())
    }
}
