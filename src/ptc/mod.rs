//! Programmatic Tool Calling: two-phase synthesis of a skill-calling program
//! from a natural-language task (spec.md §4.5).

pub mod generator;
pub mod prompts;

pub use generator::PtcGenerator;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by PTC generation.
#[derive(Debug, Error, Clone)]
pub enum PtcError {
    /// Phase A response did not contain a parseable `<plan>` block.
    #[error("plan phase failed: {0}")]
    Planning(String),
    /// Phase B response contained no fenced/`<code>` block.
    #[error("code phase failed: {0}")]
    Synthesis(String),
    /// Either phase's LLM call itself failed.
    #[error(transparent)]
    Llm(#[from] crate::llm::LlmError),
}

/// The transient output of Phase A (spec.md §3: "not persisted").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Skill names chosen by the model, filtered to ones the registry knows.
    pub selected_skills: Vec<String>,
    /// The model's stated reasoning.
    pub reasoning: String,
}

/// Raw shape decoded from inside a `<plan>...</plan>` block.
#[derive(Debug, Deserialize)]
pub(crate) struct RawPlan {
    pub selected_skills: Vec<String>,
    pub reasoning: String,
}

/// A prior conversation turn, decoupled from `agent::state` so this module
/// has no dependency on the Agent (which depends on PTC).
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// `"user"` or `"assistant"`.
    pub role: String,
    /// Turn content.
    pub content: String,
}

/// Inputs to `Generate` (spec.md §4.5).
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Chronological conversation so far; only the last K are used.
    pub history: Vec<HistoryEntry>,
    /// Current variable snapshot.
    pub variables: std::collections::HashMap<String, serde_json::Value>,
    /// Model override for both phases.
    pub model: Option<String>,
    /// Per-request restriction of the active skill set (spec.md §6
    /// `availableSkills`); `None` means every discovered skill is eligible.
    pub available_skills: Option<Vec<String>>,
    /// Outer deadline for each phase's `Chat` call, in milliseconds
    /// (spec.md §7 `Timeout`). `0` means no deadline.
    pub llm_timeout_ms: u64,
}
