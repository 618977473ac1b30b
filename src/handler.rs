//! Request Handler: the external `Execute` entry point (spec.md §6).
//!
//! The only component that converts internal errors into an external
//! status/code (spec.md §7); everything below it returns `Result`/`success`
//! flags, never panics across this boundary.

use crate::agent::AgentResult;
use crate::error::{ErrorKind, RuntimeError};
use crate::manager::Manager;
use crate::skills::{SkillMetadata, SkillRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Inbound `Execute` request (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    /// The task to run. Must be non-empty.
    pub task: String,
    /// Existing session to continue; a fresh UUID is minted when absent.
    pub session_id: Option<String>,
    /// Advisory "this is a follow-up" flag, used only for logging.
    #[serde(default)]
    pub r#continue: bool,
    /// Per-request restriction of the active skill set.
    pub available_skills: Option<Vec<String>>,
}

/// Outbound `Execute` response (spec.md §6).
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    /// Whether the run produced usable output.
    pub success: bool,
    /// Always echoed, even when minted fresh.
    pub session_id: String,
    /// Present when `success`.
    pub output: Option<Value>,
    /// Present when not `success`.
    pub error: Option<RuntimeError>,
    /// Wall-clock time spent in this call.
    pub execution_time_ms: u64,
    /// Bounded observability snapshot.
    pub state: crate::agent::state::StateSummary,
}

impl From<AgentResult> for ExecuteResponse {
    fn from(result: AgentResult) -> Self {
        Self {
            success: result.success,
            session_id: result.session_id,
            output: result.output,
            error: result.error,
            execution_time_ms: result.execution_time_ms,
            state: result.state,
        }
    }
}

/// Fronts a Session Manager and a Skill Registry with the external API
/// surface described in spec.md §6.
pub struct Handler {
    manager: Arc<Manager>,
    registry: Arc<SkillRegistry>,
}

impl Handler {
    /// Build a Handler over an already-started Manager and its Registry.
    #[must_use]
    pub fn new(manager: Arc<Manager>, registry: Arc<SkillRegistry>) -> Self {
        Self { manager, registry }
    }

    /// Run one task end to end: validate, acquire a session, run it.
    #[instrument(skip(self, request), fields(r#continue = request.r#continue))]
    pub async fn execute(&self, request: ExecuteRequest) -> ExecuteResponse {
        if request.task.trim().is_empty() {
            let session_id = request.session_id.unwrap_or_else(new_session_id);
            return validation_response(session_id, "task must not be empty");
        }

        let session_id = request.session_id.unwrap_or_else(new_session_id);
        info!(session_id = %session_id, r#continue = request.r#continue, "executing task");

        let agent = match self.manager.acquire(&session_id).await {
            Ok(agent) => agent,
            Err(err) => return manager_error_response(session_id, err),
        };

        let result = agent.run(&request.task, request.available_skills).await;
        ExecuteResponse::from(result)
    }

    /// End a session explicitly, releasing its sandbox child and state.
    pub async fn release(&self, session_id: &str) {
        self.manager.release(session_id).await;
    }

    /// Discard cached skill metadata/definitions and re-scan the skills
    /// directory (spec.md §4.1 `Reload`, SPEC_FULL.md supplemented feature).
    pub async fn reload_skills(&self) -> Result<Vec<SkillMetadata>, RuntimeError> {
        self.registry.reload().await.map_err(RuntimeError::from)
    }

    /// Shut the runtime down: no further `Acquire` succeeds afterward.
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }
}

fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

fn validation_response(session_id: String, message: &str) -> ExecuteResponse {
    ExecuteResponse {
        success: false,
        session_id,
        output: None,
        error: Some(RuntimeError::new(ErrorKind::Validation, message)),
        execution_time_ms: 0,
        state: crate::agent::state::StateSummary {
            conversation_length: 0,
            execution_count: 0,
            variables_count: 0,
        },
    }
}

fn manager_error_response(session_id: String, err: RuntimeError) -> ExecuteResponse {
    ExecuteResponse {
        success: false,
        session_id,
        output: None,
        error: Some(err),
        execution_time_ms: 0,
        state: crate::agent::state::StateSummary {
            conversation_length: 0,
            execution_count: 0,
            variables_count: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentConfig;
    use crate::llm::client::test_support::MockLlmProvider;
    use crate::manager::ManagerConfig;
    use crate::ptc::PtcGenerator;
    use crate::sandbox::LocalSandboxAdapter;

    fn test_handler() -> anyhow::Result<Handler> {
        let tmp = tempfile::tempdir()?;
        let registry = Arc::new(SkillRegistry::new(tmp.path().to_path_buf()));
        let llm = crate::llm::LlmClient::from_provider(Arc::new(MockLlmProvider::new(vec![])));
        let sandbox_dir = tempfile::tempdir()?;
        let sandbox = Arc::new(LocalSandboxAdapter::new(
            sandbox_dir.path().to_path_buf(),
            "python3".to_string(),
        ));
        let ptc = Arc::new(PtcGenerator::new(Arc::clone(&registry), llm));
        let config = ManagerConfig {
            session_timeout_ms: 60_000,
            max_sessions: 10,
            sweep_interval_ms: 60_000,
            shutdown_deadline_ms: 5_000,
            agent_config: AgentConfig::default(),
        };
        let manager = Manager::start_with_components(config, ptc, sandbox);
        Ok(Handler::new(manager, registry))
    }

    #[tokio::test]
    async fn empty_task_is_validation_error_without_touching_manager() -> anyhow::Result<()> {
        let handler = test_handler()?;
        let response = handler
            .execute(ExecuteRequest {
                task: "   ".to_string(),
                session_id: Some("s1".to_string()),
                r#continue: false,
                available_skills: None,
            })
            .await;
        assert!(!response.success);
        let Some(error) = response.error else {
            anyhow::bail!("expected a validation error");
        };
        assert_eq!(error.kind, ErrorKind::Validation);
        assert_eq!(response.session_id, "s1");
        Ok(())
    }

    #[tokio::test]
    async fn missing_session_id_mints_a_fresh_one() -> anyhow::Result<()> {
        let handler = test_handler()?;
        let response = handler
            .execute(ExecuteRequest {
                task: "".to_string(),
                session_id: None,
                r#continue: false,
                available_skills: None,
            })
            .await;
        assert!(Uuid::parse_str(&response.session_id).is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn execute_after_shutdown_is_manager_closed() -> anyhow::Result<()> {
        let handler = test_handler()?;
        handler.shutdown().await;
        let response = handler
            .execute(ExecuteRequest {
                task: "do something".to_string(),
                session_id: Some("s1".to_string()),
                r#continue: false,
                available_skills: None,
            })
            .await;
        assert!(!response.success);
        let Some(error) = response.error else {
            anyhow::bail!("expected a ManagerClosed error");
        };
        assert_eq!(error.kind, ErrorKind::ManagerClosed);
        Ok(())
    }
}
