//! Per-session orchestrator (spec.md §4.6).

use super::state::{ConversationRole, SessionState, StateSummary};
use crate::error::RuntimeError;
use crate::ptc::{GenerateOptions, HistoryEntry, PtcGenerator};
use crate::sandbox::{ExecuteOptions, LocalSandboxAdapter};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::utils::elapsed_ms;

/// Per-session construction parameters, shared across every Agent the
/// Manager constructs (spec.md §4.7 `agentConfig`).
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model override passed through to PTC generation.
    pub llm_model: Option<String>,
    /// Wall-clock budget for one `Sandbox.Execute` call.
    pub timeout_ms: u64,
    /// Outer deadline for a single PTC plan/implement LLM call (spec.md §7
    /// `Timeout`: "LLM call exceeded outer deadline").
    pub llm_timeout_ms: u64,
    /// Directory containing skill handler implementations.
    pub skill_impl_path: PathBuf,
    /// Conversation history cap.
    pub max_conversation_entries: usize,
    /// Execution history cap.
    pub max_execution_records: usize,
    /// Override for the binary the sandbox shells out to for skill
    /// execution; `None` defaults to the current executable.
    pub runtime_binary_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            llm_model: None,
            timeout_ms: crate::config::get_sandbox_default_timeout_ms(),
            llm_timeout_ms: crate::config::get_llm_call_timeout_ms(),
            skill_impl_path: PathBuf::from(crate::config::get_skills_dir()),
            max_conversation_entries: crate::config::get_max_conversation_entries(),
            max_execution_records: crate::config::get_max_execution_records(),
            runtime_binary_path: None,
        }
    }
}

/// The result of one `Run` (spec.md §4.6, §6).
#[derive(Debug, Clone)]
pub struct AgentResult {
    /// Whether the run produced usable output.
    pub success: bool,
    /// Always echoed.
    pub session_id: String,
    /// Present when `success`.
    pub output: Option<Value>,
    /// Present when not `success`.
    pub error: Option<RuntimeError>,
    /// Bounded observability snapshot.
    pub state: StateSummary,
    /// Wall-clock time spent in this `Run`.
    pub execution_time_ms: u64,
}

/// Owns one session's state and drives one `Run` at a time. The caller
/// guarantees `Run` calls for a given Agent are never issued concurrently
/// (spec.md §5), so no internal synchronization is required for
/// correctness; the `Mutex` below exists only so `&self` methods can mutate
/// state through a shared `Arc<Agent>` without `unsafe`.
pub struct Agent {
    session_id: String,
    config: AgentConfig,
    ptc: Arc<PtcGenerator>,
    sandbox: Arc<LocalSandboxAdapter>,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Construct a fresh Agent bound to `session_id` (spec.md §4.6).
    #[must_use]
    pub fn new(
        config: AgentConfig,
        session_id: String,
        ptc: Arc<PtcGenerator>,
        sandbox: Arc<LocalSandboxAdapter>,
    ) -> Self {
        let state = SessionState::new(
            session_id.clone(),
            config.max_conversation_entries,
            config.max_execution_records,
        );
        Self {
            session_id,
            config,
            ptc,
            sandbox,
            state: Mutex::new(state),
        }
    }

    /// This session's identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run one task to completion (spec.md §4.6 `Run` algorithm).
    ///
    /// `available_skills` restricts the active skill set for this call only
    /// (spec.md §6 `availableSkills`); `None` allows every discovered skill.
    #[instrument(skip(self, task, available_skills), fields(session_id = %self.session_id))]
    pub async fn run(&self, task: &str, available_skills: Option<Vec<String>>) -> AgentResult {
        let start = Instant::now();
        let mut state = self.state.lock().await;
        state.touch();
        state.push_conversation(ConversationRole::User, task);

        let generate_options = GenerateOptions {
            history: conversation_history(&state),
            variables: state.variables().clone(),
            model: self.config.llm_model.clone(),
            available_skills,
            llm_timeout_ms: self.config.llm_timeout_ms,
        };

        let code = match self.ptc.generate(task, generate_options).await {
            Ok(code) => code,
            Err(err) => {
                let error: RuntimeError = err.into();
                state.push_conversation(ConversationRole::Assistant, format!("Error: {error}"));
                return AgentResult {
                    success: false,
                    session_id: self.session_id.clone(),
                    output: None,
                    error: Some(error),
                    state: state.summary(),
                    execution_time_ms: elapsed_ms(start),
                };
            }
        };

        let sandbox_result = self
            .sandbox
            .execute(
                &code,
                ExecuteOptions {
                    session_id: self.session_id.clone(),
                    timeout_ms: self.config.timeout_ms,
                    skill_impl_path: self.config.skill_impl_path.clone(),
                    env: Vec::new(),
                    runtime_binary_path: self.config.runtime_binary_path.clone(),
                },
            )
            .await;

        if !sandbox_result.success {
            let kind_error = sandbox_result.error.as_ref().map_or_else(
                || RuntimeError::internal("sandbox execution failed with no structured error"),
                |detail| RuntimeError::new(parse_error_kind(&detail.kind), detail.message.clone()),
            );
            state.push_conversation(
                ConversationRole::Assistant,
                format!("Error: {}", kind_error.message),
            );
            return AgentResult {
                success: false,
                session_id: self.session_id.clone(),
                output: None,
                error: Some(kind_error),
                state: state.summary(),
                execution_time_ms: elapsed_ms(start),
            };
        }

        let output = parse_stdout(&sandbox_result.stdout);
        if let Some(vars) = output.as_ref().and_then(|v| v.get("variables")).and_then(Value::as_object) {
            state.merge_variables(vars);
        }

        state.push_conversation(ConversationRole::Assistant, sandbox_result.stdout.clone());
        state.push_execution(task, output.clone(), sandbox_result.execution_time_ms);

        AgentResult {
            success: true,
            session_id: self.session_id.clone(),
            output,
            error: None,
            state: state.summary(),
            execution_time_ms: elapsed_ms(start),
        }
    }

    /// Bounded observability snapshot.
    pub async fn get_state(&self) -> StateSummary {
        self.state.lock().await.summary()
    }

    /// Set a variable; last-write-wins (spec.md §4.6).
    pub async fn set_variable(&self, key: impl Into<String>, value: Value) {
        self.state.lock().await.set_variable(key, value);
    }

    /// Read a variable.
    pub async fn get_variable(&self, key: &str) -> Option<Value> {
        self.state.lock().await.get_variable(key).cloned()
    }

    /// Terminate the sandbox child and empty session state (spec.md §4.6).
    /// Idempotent: calling twice leaves the same empty final state.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn cleanup(&self) {
        let _ = self.sandbox.cleanup(&self.session_id).await;
        self.state.lock().await.clear();
    }
}

fn conversation_history(state: &SessionState) -> Vec<HistoryEntry> {
    state
        .conversation()
        .iter()
        .map(|m| HistoryEntry {
            role: match m.role {
                ConversationRole::User => "user".to_string(),
                ConversationRole::Assistant => "assistant".to_string(),
            },
            content: m.content.clone(),
        })
        .collect()
}

fn parse_stdout(stdout: &str) -> Option<Value> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok().or_else(|| Some(Value::String(trimmed.to_string())))
}

fn parse_error_kind(kind: &str) -> crate::error::ErrorKind {
    use crate::error::ErrorKind;
    match kind {
        "Timeout" => ErrorKind::Timeout,
        "Validation" => ErrorKind::Validation,
        "SkillNotFound" => ErrorKind::SkillNotFound,
        _ => ErrorKind::Execution,
    }
}

