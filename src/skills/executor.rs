//! Skill executor: typed dispatch across the three skill kinds (spec.md §4.2).

use super::registry::SkillRegistry;
use super::types::{SkillDefinition, SkillKind, SkillResult as SkillOutcome};
use super::{SkillError, SkillResult};
use lazy_regex::{lazy_regex, Lazy};
use regex::{Captures, Regex};
use serde_json::Value;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::instrument;

use crate::utils::elapsed_ms;

static TEMPLATE_KEY_RE: Lazy<Regex> = lazy_regex!(r"\{\{(\w[\w.-]*)\}\}");

/// Dispatches `Execute(name, input)` against a `SkillRegistry`.
pub struct SkillExecutor {
    registry: Arc<SkillRegistry>,
}

impl SkillExecutor {
    /// Build an executor bound to a registry.
    #[must_use]
    pub fn new(registry: Arc<SkillRegistry>) -> Self {
        Self { registry }
    }

    /// Execute skill `name` with `input`, per spec.md §4.2 steps 1-6.
    #[instrument(skip(self, input), fields(skill = %name))]
    pub async fn execute(&self, name: &str, input: Value) -> SkillOutcome {
        let start = Instant::now();

        let definition = match self.registry.load_full(name).await {
            Ok(def) => def,
            Err(SkillError::SkillNotFound(_)) => {
                return SkillOutcome::failed(
                    "SkillNotFound",
                    format!("skill not found: {name}"),
                    elapsed_ms(start),
                )
            }
            Err(err) => {
                return SkillOutcome::failed("Execution", err.to_string(), elapsed_ms(start));
            }
        };

        if let Err(detail) = validate_input(&definition.input_schema, &input) {
            return SkillOutcome::failed("Validation", detail, elapsed_ms(start));
        }

        let dispatch = match definition.metadata.kind {
            SkillKind::PurePrompt => self.dispatch_prompt(&definition, &input),
            SkillKind::PureScript | SkillKind::Hybrid => {
                self.dispatch_handler(&definition, &input).await
            }
        };

        match dispatch {
            Ok(output) => SkillOutcome::ok(output, elapsed_ms(start)),
            Err(SkillError::HandlerTimeout { .. }) => {
                SkillOutcome::failed("Timeout", "handler timed out", elapsed_ms(start))
            }
            Err(err) => SkillOutcome::failed("Execution", err.to_string(), elapsed_ms(start)),
        }
    }

    fn dispatch_prompt(&self, definition: &SkillDefinition, input: &Value) -> SkillResult<Value> {
        let template = definition.prompt_template.as_deref().ok_or_else(|| {
            SkillError::MissingDefinition {
                name: definition.metadata.name.clone(),
                detail: "pure-prompt skill has no prompt_template".to_string(),
            }
        })?;
        let rendered = render_template(template, input);
        Ok(serde_json::json!({ "kind": "prompt", "content": rendered }))
    }

    async fn dispatch_handler(
        &self,
        definition: &SkillDefinition,
        input: &Value,
    ) -> SkillResult<Value> {
        let name = &definition.metadata.name;
        let execution = definition.execution.as_ref().ok_or_else(|| {
            SkillError::MissingDefinition {
                name: name.clone(),
                detail: "missing execution descriptor".to_string(),
            }
        })?;

        let handler_path = definition.metadata.path.join(&execution.handler_file);
        let interpreter = crate::config::get_interpreter_path();
        let payload = serde_json::to_vec(input).map_err(|e| SkillError::HandlerExecution {
            name: name.clone(),
            detail: format!("failed to encode input: {e}"),
        })?;

        let mut child = Command::new(&interpreter)
            .arg(&handler_path)
            .arg(&execution.function_name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SkillError::HandlerExecution {
                name: name.clone(),
                detail: format!("failed to spawn handler: {e}"),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(&payload).await;
        }

        let timeout_dur = Duration::from_millis(execution.timeout_ms);
        let output = tokio::time::timeout(timeout_dur, child.wait_with_output())
            .await
            .map_err(|_| SkillError::HandlerTimeout {
                name: name.clone(),
                timeout_ms: execution.timeout_ms,
            })?
            .map_err(|e| SkillError::HandlerExecution {
                name: name.clone(),
                detail: format!("failed to await handler: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(SkillError::HandlerExecution {
                name: name.clone(),
                detail: if stderr.is_empty() {
                    format!("handler exited with status {}", output.status)
                } else {
                    stderr
                },
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| SkillError::HandlerExecution {
            name: name.clone(),
            detail: format!("handler produced non-JSON output: {e}"),
        })
    }
}

/// Substitute each `{{key}}` in `template` with `input[key]`. Unknown keys
/// are left literal (spec.md §4.2 step 4).
fn render_template(template: &str, input: &Value) -> String {
    TEMPLATE_KEY_RE
        .replace_all(template, |caps: &Captures<'_>| {
            let key = &caps[1];
            match input.get(key) {
                Some(Value::String(s)) => s.clone(),
                Some(v) => v.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Validate `input` against `schema`, returning a human-readable detail on
/// failure (spec.md §4.2 step 3: missing-required and shape mismatch both
/// surface as `Validation`).
fn validate_input(schema: &Value, input: &Value) -> Result<(), String> {
    if schema.is_null() {
        return Ok(());
    }
    if let Value::Object(obj) = schema {
        if obj.is_empty() {
            return Ok(());
        }
    }
    let validator = jsonschema::validator_for(schema).map_err(|e| e.to_string())?;
    validator.validate(input).map_err(|e| e.to_string())
}
