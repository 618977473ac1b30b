//! Configuration and settings management
//!
//! Loads settings from environment variables and defines configuration
//! constants used across the runtime. Mirrors the teacher's layered
//! `config`-crate + env-var-getter approach: a `Settings` struct covers the
//! things a deployer plausibly wants in a config file, while narrower knobs
//! (timeouts, caps, bounds) are read directly from the environment through
//! small `get_*()` functions with hardcoded defaults.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Which LLM wire format to speak, selected at construction (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LlmProviderKind {
    /// Anthropic-style: messages + separate system prompt + `max_tokens`.
    #[default]
    Anthropic,
    /// OpenAI-compatible: messages with an inline system role.
    OpenAiCompatible,
}

impl LlmProviderKind {
    fn from_env_str(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai-compatible" | "openai_compatible" | "openai" => Self::OpenAiCompatible,
            _ => Self::Anthropic,
        }
    }
}

/// Application settings loaded from environment variables / config files.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// API key for the configured LLM provider (`*_API_KEY`).
    pub llm_api_key: Option<String>,
    /// Model identifier passed to `Chat`.
    pub llm_model: Option<String>,
    /// Override base URL for the LLM endpoint.
    pub llm_base_url: Option<String>,
    /// Path to the sandbox language interpreter binary.
    pub interpreter_path: Option<String>,
    /// Root directory for per-session sandbox workspaces.
    pub sandbox_workspace: Option<String>,
    /// Root directory for skill discovery.
    pub skills_dir: Option<String>,
}

impl Settings {
    /// Load settings from `.env`, optional config files, and the
    /// environment, in that precedence order (environment wins).
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a config file is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let built = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let mut settings: Self = built.try_deserialize().unwrap_or_default();

        if settings.llm_api_key.is_none() {
            settings.llm_api_key = std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("LLM_API_KEY").ok())
                .filter(|s| !s.is_empty());
        }

        Ok(settings)
    }

    /// Resolved provider selection from `LLM_PROVIDER`.
    #[must_use]
    pub fn llm_provider_kind(&self) -> LlmProviderKind {
        std::env::var("LLM_PROVIDER")
            .ok()
            .map_or(LlmProviderKind::default(), |s| {
                LlmProviderKind::from_env_str(&s)
            })
    }
}

// ── Session Manager configuration (spec.md §4.7) ────────────────────────────

/// Default idle-timeout before a session is swept (30 minutes).
pub const SESSION_TIMEOUT_MS: u64 = 30 * 60 * 1000;
/// Default cardinality bound on resident sessions.
pub const MAX_SESSIONS: usize = 1000;
/// Interval between sweeper passes.
pub const SWEEP_INTERVAL_MS: u64 = 60_000;
/// Hard deadline bounding `Manager::shutdown`.
pub const SHUTDOWN_DEADLINE_MS: u64 = 30_000;

/// Get the session idle timeout (ms) from env or default.
#[must_use]
pub fn get_session_timeout_ms() -> u64 {
    std::env::var("SESSION_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(SESSION_TIMEOUT_MS)
}

/// Get the maximum resident session count from env or default.
#[must_use]
pub fn get_max_sessions() -> usize {
    std::env::var("MAX_SESSIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(MAX_SESSIONS)
}

/// Get the sweeper interval (ms) from env or default.
#[must_use]
pub fn get_sweep_interval_ms() -> u64 {
    std::env::var("SWEEP_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(SWEEP_INTERVAL_MS)
}

/// Get the shutdown hard deadline (ms) from env or default.
#[must_use]
pub fn get_shutdown_deadline_ms() -> u64 {
    std::env::var("SHUTDOWN_DEADLINE_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(SHUTDOWN_DEADLINE_MS)
}

// ── Agent / history bound configuration (spec.md §5) ────────────────────────

/// Default cap on retained conversation messages.
pub const MAX_CONVERSATION_ENTRIES: usize = 100;
/// Default cap on retained execution records.
pub const MAX_EXECUTION_RECORDS: usize = 50;
/// Number of trailing conversation turns fed into PTC context.
pub const HISTORY_CONTEXT_WINDOW: usize = 5;

/// Get the conversation cap from env or default.
#[must_use]
pub fn get_max_conversation_entries() -> usize {
    std::env::var("MAX_CONVERSATION_ENTRIES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(MAX_CONVERSATION_ENTRIES)
}

/// Get the execution-record cap from env or default.
#[must_use]
pub fn get_max_execution_records() -> usize {
    std::env::var("MAX_EXECUTION_RECORDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(MAX_EXECUTION_RECORDS)
}

// ── Sandbox configuration (spec.md §4.4) ────────────────────────────────────

/// Default per-call execution timeout.
pub const SANDBOX_DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Grace window between graceful termination and a hard kill.
pub const SANDBOX_KILL_GRACE_MS: u64 = 2_000;
/// Default per-stream (stdout/stderr) capture cap.
pub const SANDBOX_OUTPUT_CAP_BYTES: usize = 1024 * 1024;
/// Marker appended when captured output is truncated.
pub const SANDBOX_TRUNCATION_MARKER: &str = "\n...[truncated]";

/// Get the configured interpreter path from env or the conventional default.
#[must_use]
pub fn get_interpreter_path() -> String {
    std::env::var("INTERPRETER_PATH").unwrap_or_else(|_| "python3".to_string())
}

/// Get the sandbox workspace root from env or default (`./sandbox-workspace`).
#[must_use]
pub fn get_sandbox_workspace_root() -> String {
    std::env::var("SANDBOX_WORKSPACE").unwrap_or_else(|_| "sandbox-workspace".to_string())
}

/// Get the stdout/stderr capture cap (bytes) from env or default.
#[must_use]
pub fn get_sandbox_output_cap_bytes() -> usize {
    std::env::var("SANDBOX_OUTPUT_CAP_BYTES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(SANDBOX_OUTPUT_CAP_BYTES)
}

/// Get the default sandbox execution timeout (ms) from env or default.
#[must_use]
pub fn get_sandbox_default_timeout_ms() -> u64 {
    std::env::var("SANDBOX_DEFAULT_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(SANDBOX_DEFAULT_TIMEOUT_MS)
}

/// Get the graceful-to-hard-kill grace window (ms) from env or default.
#[must_use]
pub fn get_sandbox_kill_grace_ms() -> u64 {
    std::env::var("SANDBOX_KILL_GRACE_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(SANDBOX_KILL_GRACE_MS)
}

// ── Skill registry configuration (spec.md §4.1) ─────────────────────────────

/// Default skills directory.
pub const SKILLS_DIR: &str = "skills";

/// Get the skills directory from env or default.
#[must_use]
pub fn get_skills_dir() -> String {
    std::env::var("SKILLS_DIR").unwrap_or_else(|_| SKILLS_DIR.to_string())
}

/// Default per-handler timeout for `pure-script`/`hybrid` skills.
pub const SKILL_HANDLER_TIMEOUT_MS: u64 = 10_000;

/// Get the skill handler timeout (ms) from env or default.
#[must_use]
pub fn get_skill_handler_timeout_ms() -> u64 {
    std::env::var("SKILL_HANDLER_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(SKILL_HANDLER_TIMEOUT_MS)
}

// ── LLM client configuration (spec.md §4.3) ─────────────────────────────────

/// Default HTTP timeout for LLM requests (seconds).
pub const LLM_HTTP_TIMEOUT_SECS: u64 = 120;
/// Default `max_tokens` for a chat completion.
pub const LLM_DEFAULT_MAX_TOKENS: u32 = 4096;
/// Default temperature; kept modest to favor PTC reproducibility.
pub const LLM_DEFAULT_TEMPERATURE: f32 = 0.2;
/// Default outer deadline for a single PTC plan/implement `Chat` call
/// (spec.md §7 `Timeout`: "LLM call exceeded outer deadline").
pub const LLM_CALL_TIMEOUT_MS: u64 = 20_000;

/// Get the LLM HTTP timeout (seconds) from env or default.
#[must_use]
pub fn get_llm_http_timeout_secs() -> u64 {
    std::env::var("LLM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LLM_HTTP_TIMEOUT_SECS)
}

/// Get the LLM call outer deadline (milliseconds) from env or default.
#[must_use]
pub fn get_llm_call_timeout_ms() -> u64 {
    std::env::var("LLM_CALL_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LLM_CALL_TIMEOUT_MS)
}

/// Get the configured model name, falling back to a provider-appropriate default.
#[must_use]
pub fn get_llm_model(settings: &Settings) -> String {
    std::env::var("LLM_MODEL")
        .ok()
        .or_else(|| settings.llm_model.clone())
        .unwrap_or_else(|| match settings.llm_provider_kind() {
            LlmProviderKind::Anthropic => "claude-3-5-sonnet-latest".to_string(),
            LlmProviderKind::OpenAiCompatible => "gpt-4o-mini".to_string(),
        })
}

/// Get the LLM base URL, falling back to the provider's public default.
#[must_use]
pub fn get_llm_base_url(settings: &Settings) -> String {
    std::env::var("LLM_BASE_URL")
        .ok()
        .or_else(|| settings.llm_base_url.clone())
        .unwrap_or_else(|| match settings.llm_provider_kind() {
            LlmProviderKind::Anthropic => "https://api.anthropic.com/v1/messages".to_string(),
            LlmProviderKind::OpenAiCompatible => {
                "https://api.openai.com/v1/chat/completions".to_string()
            }
        })
}
