//! Round-trip / idempotence laws for the Skill Registry, exercised through
//! the Request Handler's `Reload` (spec.md §8, SPEC_FULL.md §3).

mod support;

use agent_runtime_core::agent::AgentConfig;
use agent_runtime_core::handler::Handler;
use agent_runtime_core::manager::{Manager, ManagerConfig};
use agent_runtime_core::ptc::PtcGenerator;
use agent_runtime_core::sandbox::LocalSandboxAdapter;
use agent_runtime_core::skills::SkillRegistry;
use anyhow::Result;
use std::sync::Arc;
use support::{write_skill, ScriptedLlmProvider};

fn build_handler(skills_dir: &std::path::Path) -> Result<Handler> {
    let sandbox_tmp = tempfile::tempdir()?;
    let registry = Arc::new(SkillRegistry::new(skills_dir.to_path_buf()));
    let llm = agent_runtime_core::llm::LlmClient::from_provider(Arc::new(ScriptedLlmProvider::new(vec![])));
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
            agent_config: AgentConfig::default(),
        },
        ptc,
        sandbox,
    );
    Ok(Handler::new(manager, registry))
}

#[tokio::test]
async fn reload_picks_up_skills_added_after_construction() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let handler = build_handler(tmp.path())?;

    let first = handler.reload_skills().await?;
    assert!(first.is_empty());

    write_skill(
        tmp.path(),
        "summarize",
        "name: summarize\nkind: pure-prompt\nprompt_template: \"Summarize: {{content}}\"\n",
    )?;

    let second = handler.reload_skills().await?;
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].name, "summarize");
    Ok(())
}

#[tokio::test]
async fn reload_is_stable_given_an_unchanged_filesystem() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    write_skill(
        tmp.path(),
        "summarize",
        "name: summarize\nkind: pure-prompt\nprompt_template: \"Summarize: {{content}}\"\n",
    )?;
    let handler = build_handler(tmp.path())?;

    let first = handler.reload_skills().await?;
    let second = handler.reload_skills().await?;
    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].name, second[0].name);
    Ok(())
}
