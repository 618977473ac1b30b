//! Skill data model (spec.md §3).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;

/// The closed set of skill kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkillKind {
    /// A templated prompt only; no handler, no LLM call inside the executor.
    PurePrompt,
    /// A callable written in the sandbox language; no LLM call.
    PureScript,
    /// A callable that may itself invoke the LLM.
    Hybrid,
}

impl SkillKind {
    /// Parse from the `type`/`kind` value in `skill.yaml`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "pure-prompt" => Some(Self::PurePrompt),
            "pure-script" => Some(Self::PureScript),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }

    /// Whether this kind requires an `execution` descriptor (spec.md §3).
    #[must_use]
    pub fn requires_execution(self) -> bool {
        matches!(self, Self::PureScript | Self::Hybrid)
    }
}

/// Level-1 metadata, loaded eagerly by `Registry::scan` (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillMetadata {
    /// Unique, kebab-case skill name; must match the directory name.
    pub name: String,
    /// Free-form version string.
    pub version: String,
    /// Human-readable description surfaced in PTC plan prompts.
    pub description: String,
    /// Unordered set of tags, used by `List(tagsFilter)`.
    pub tags: HashSet<String>,
    /// One of the three skill kinds.
    pub kind: SkillKind,
    /// On-disk directory this skill was loaded from.
    pub path: PathBuf,
}

/// The `execution` descriptor for `pure-script`/`hybrid` skills (spec.md §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionDescriptor {
    /// Path to the handler file, relative to the skill directory.
    pub handler_file: PathBuf,
    /// Entry-point function name inside the handler.
    pub function_name: String,
    /// Handler timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Level-2 definition, loaded lazily by `Registry::load_full` and cached
/// (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDefinition {
    /// Level-1 metadata this definition was built from.
    pub metadata: SkillMetadata,
    /// JSON-Schema-shaped input contract.
    pub input_schema: Value,
    /// JSON-Schema-shaped output contract.
    pub output_schema: Value,
    /// Required for `pure-prompt`; a string with `{{key}}` placeholders.
    pub prompt_template: Option<String>,
    /// Required for `pure-script`/`hybrid`.
    pub execution: Option<ExecutionDescriptor>,
}

/// A structured `{kind, message}` error surfaced on `SkillResult` (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillErrorDetail {
    /// The error kind string (`SkillNotFound`, `Validation`, `Execution`, ...).
    pub kind: String,
    /// Human-readable detail.
    pub message: String,
}

/// The result of `Executor::execute` (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillResult {
    /// Whether the skill ran to completion without error.
    pub success: bool,
    /// Present when `success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Present when not `success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SkillErrorDetail>,
    /// Wall-clock time spent executing, in milliseconds.
    pub execution_time_ms: u64,
}

impl SkillResult {
    /// Build a success result.
    #[must_use]
    pub fn ok(output: Value, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
            execution_time_ms,
        }
    }

    /// Build a failure result.
    #[must_use]
    pub fn failed(kind: &str, message: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(SkillErrorDetail {
                kind: kind.to_string(),
                message: message.into(),
            }),
            execution_time_ms,
        }
    }
}
