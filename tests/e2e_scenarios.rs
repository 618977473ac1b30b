//! Concrete end-to-end scenarios from spec.md §8, run against a real
//! `python3` interpreter and the actual compiled binary (the sandbox's
//! `SkillExecutor` shim shells out to it via the hidden `__skill-exec`
//! subcommand). Ignored by default: they require both a `python3` on PATH
//! and a built `agent-runtime-core` binary.

mod support;

use agent_runtime_core::agent::AgentConfig;
use agent_runtime_core::handler::{ExecuteRequest, Handler};
use agent_runtime_core::manager::{Manager, ManagerConfig};
use agent_runtime_core::ptc::PtcGenerator;
use agent_runtime_core::sandbox::LocalSandboxAdapter;
use agent_runtime_core::skills::SkillRegistry;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::sync::Arc;
use support::{write_skill, ScriptedLlmProvider};

fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_agent-runtime-core"))
}

fn build_handler(skills_dir: &std::path::Path, responses: Vec<&str>, timeout_ms: u64) -> Result<Handler> {
    let sandbox_tmp = tempfile::tempdir()?;
    let registry = Arc::new(SkillRegistry::new(skills_dir.to_path_buf()));
    let llm = agent_runtime_core::llm::LlmClient::from_provider(Arc::new(ScriptedLlmProvider::new(responses)));
    let ptc = Arc::new(PtcGenerator::new(Arc::clone(&registry), llm));
    let sandbox = Arc::new(LocalSandboxAdapter::new(
        sandbox_tmp.path().to_path_buf(),
        "python3".to_string(),
    ));
    let manager = Manager::start_with_components(
        ManagerConfig {
            session_timeout_ms: 1_000_000,
            max_sessions: 10,
            sweep_interval_ms: 1_000_000,
            shutdown_deadline_ms: 5_000,
            agent_config: AgentConfig {
                timeout_ms,
                skill_impl_path: skills_dir.to_path_buf(),
                runtime_binary_path: Some(binary_path()),
                ..AgentConfig::default()
            },
        },
        ptc,
        sandbox,
    );
    Ok(Handler::new(manager, registry))
}

#[tokio::test]
#[ignore = "requires a real python3 interpreter on PATH and a built binary"]
async fn fresh_session_pure_prompt_skill() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_skill(
        tmp.path(),
        "summarize",
        "name: summarize\nkind: pure-prompt\nprompt_template: \"Summarize: {{content}}\"\n",
    )?;
    let handler = build_handler(
        tmp.path(),
        vec![
            r#"<plan>{"selected_skills":["summarize"],"reasoning":"only one fits"}</plan>"#,
            "```python\nr = await executor.execute('summarize', {'content': 'hello world'})\nprint(r)\n```",
        ],
        10_000,
    )?;

    let response = handler
        .execute(ExecuteRequest {
            task: "summarize this: hello world".to_string(),
            session_id: None,
            r#continue: false,
            available_skills: None,
        })
        .await;

    assert!(response.success);
    assert!(!response.session_id.is_empty());
    assert_eq!(response.output, Some(serde_json::json!("Summarize: hello world")));
    assert_eq!(response.state.conversation_length, 2);
    assert_eq!(response.state.execution_count, 1);
    Ok(())
}

#[tokio::test]
#[ignore = "requires a real python3 interpreter on PATH and a built binary"]
async fn multi_turn_continuity_reuses_the_same_session() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_skill(
        tmp.path(),
        "summarize",
        "name: summarize\nkind: pure-prompt\nprompt_template: \"Summarize: {{content}}\"\n",
    )?;
    let handler = build_handler(
        tmp.path(),
        vec![
            r#"<plan>{"selected_skills":["summarize"],"reasoning":"first"}</plan>"#,
            "```python\nprint(await executor.execute('summarize', {'content': 'a'}))\n```",
            r#"<plan>{"selected_skills":["summarize"],"reasoning":"second"}</plan>"#,
            "```python\nprint(await executor.execute('summarize', {'content': 'b'}))\n```",
        ],
        10_000,
    )?;

    let first = handler
        .execute(ExecuteRequest {
            task: "summarize a".to_string(),
            session_id: None,
            r#continue: false,
            available_skills: None,
        })
        .await;
    assert!(first.success);

    let second = handler
        .execute(ExecuteRequest {
            task: "do it again".to_string(),
            session_id: Some(first.session_id.clone()),
            r#continue: true,
            available_skills: None,
        })
        .await;

    assert!(second.success);
    assert_eq!(second.session_id, first.session_id);
    assert_eq!(second.state.conversation_length, 4);
    assert_eq!(second.state.execution_count, 2);
    Ok(())
}

#[tokio::test]
#[ignore = "requires a real python3 interpreter on PATH and a built binary"]
async fn sandbox_timeout_kills_the_child_and_reports_timeout() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let handler = build_handler(
        tmp.path(),
        vec![
            r#"<plan>{"selected_skills":[],"reasoning":"no skills needed"}</plan>"#,
            "```python\nimport asyncio\nawait asyncio.sleep(5)\nprint('done')\n```",
        ],
        500,
    )?;

    let response = handler
        .execute(ExecuteRequest {
            task: "sleep forever".to_string(),
            session_id: None,
            r#continue: false,
            available_skills: None,
        })
        .await;

    assert!(!response.success);
    let Some(error) = response.error else {
        bail!("expected a structured error on timeout");
    };
    assert_eq!(error.kind, agent_runtime_core::error::ErrorKind::Timeout);
    Ok(())
}

#[tokio::test]
#[ignore = "requires a real python3 interpreter on PATH and a built binary"]
async fn skill_not_found_is_caught_by_the_synthesized_code_not_the_sandbox() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let handler = build_handler(
        tmp.path(),
        vec![
            r#"<plan>{"selected_skills":[],"reasoning":"foo-skill is unknown, filtered out"}</plan>"#,
            "```python\nr = await executor.execute('foo-skill', {})\nprint(r)\n```",
        ],
        10_000,
    )?;

    let response = handler
        .execute(ExecuteRequest {
            task: "call a skill that doesn't exist".to_string(),
            session_id: None,
            r#continue: false,
            available_skills: None,
        })
        .await;

    assert!(response.success);
    let Some(output) = response.output else {
        bail!("expected structured output describing the SkillNotFound error");
    };
    assert_eq!(output["error"]["kind"], serde_json::json!("SkillNotFound"));
    Ok(())
}

#[tokio::test]
#[ignore = "requires a real python3 interpreter on PATH and a built binary"]
async fn pure_script_skill_returns_structured_output() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let skill_dir = tmp.path().join("code-analysis");
    std::fs::create_dir_all(&skill_dir)?;
    std::fs::write(
        skill_dir.join("skill.yaml"),
        "name: code-analysis\n\
         kind: pure-script\n\
         execution:\n\
         \x20\x20handler: handler.py\n\
         \x20\x20function: analyze\n\
         \x20\x20timeout: 5000\n",
    )?;
    std::fs::write(
        skill_dir.join("handler.py"),
        "import sys\n\
         import json\n\
         \n\
         def analyze(payload):\n\
         \x20\x20\x20\x20return {\"score\": 95, \"issues\": []}\n\
         \n\
         if __name__ == \"__main__\":\n\
         \x20\x20\x20\x20json.loads(sys.stdin.read() or \"null\")\n\
         \x20\x20\x20\x20print(json.dumps(analyze(None)))\n",
    )?;

    let handler = build_handler(
        tmp.path(),
        vec![
            r#"<plan>{"selected_skills":["code-analysis"],"reasoning":"only one fits"}</plan>"#,
            "```python\nr = await executor.execute('code-analysis', {})\nprint(r)\n```",
        ],
        10_000,
    )?;

    let response = handler
        .execute(ExecuteRequest {
            task: "analyze this code".to_string(),
            session_id: None,
            r#continue: false,
            available_skills: None,
        })
        .await;

    assert!(response.success);
    assert_eq!(
        response.output,
        Some(serde_json::json!({ "score": 95, "issues": [] }))
    );
    assert!(response.execution_time_ms > 0);
    Ok(())
}

#[tokio::test]
#[ignore = "requires a real python3 interpreter on PATH and a built binary"]
async fn idle_session_is_reclaimed_and_a_later_acquire_starts_fresh() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_skill(
        tmp.path(),
        "summarize",
        "name: summarize\nkind: pure-prompt\nprompt_template: \"Summarize: {{content}}\"\n",
    )?;

    let sandbox_tmp = tempfile::tempdir()?;
    let registry = Arc::new(SkillRegistry::new(tmp.path().to_path_buf()));
    let llm = agent_runtime_core::llm::LlmClient::from_provider(Arc::new(ScriptedLlmProvider::new(vec![
        r#"<plan>{"selected_skills":["summarize"],"reasoning":"only one fits"}</plan>"#,
        "```python\nprint(await executor.execute('summarize', {'content': 'hi'}))\n```",
    ])));
    let ptc = Arc::new(PtcGenerator::new(Arc::clone(&registry), llm));
    let sandbox = Arc::new(LocalSandboxAdapter::new(
        sandbox_tmp.path().to_path_buf(),
        "python3".to_string(),
    ));
    let manager = Manager::start_with_components(
        ManagerConfig {
            session_timeout_ms: 200,
            max_sessions: 10,
            sweep_interval_ms: 100,
            shutdown_deadline_ms: 5_000,
            agent_config: AgentConfig {
                timeout_ms: 10_000,
                skill_impl_path: tmp.path().to_path_buf(),
                runtime_binary_path: Some(binary_path()),
                ..AgentConfig::default()
            },
        },
        ptc,
        sandbox,
    );
    let handler = Handler::new(Arc::clone(&manager), Arc::clone(&registry));

    let first = handler
        .execute(ExecuteRequest {
            task: "summarize hi".to_string(),
            session_id: Some("S1".to_string()),
            r#continue: false,
            available_skills: None,
        })
        .await;
    assert!(first.success);
    assert_eq!(manager.count().await, 1);

    tokio::time::sleep(std::time::Duration::from_millis(600)).await;
    assert_eq!(manager.count().await, 0);

    let second = handler
        .execute(ExecuteRequest {
            task: "summarize hi again".to_string(),
            session_id: Some("S1".to_string()),
            r#continue: true,
            available_skills: None,
        })
        .await;
    assert!(second.success);
    assert_eq!(second.state.conversation_length, 2);
    Ok(())
}
