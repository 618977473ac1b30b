//! Skill registry and executor (spec.md §4.1, §4.2).
//!
//! A skill is an on-disk directory with a `skill.yaml` descriptor. The
//! registry discovers metadata eagerly (`Scan`) and loads full definitions
//! lazily and caches them (`LoadFull`), mirroring the teacher's two-level
//! metadata/definition split in `agent/skills/registry.rs`. The executor
//! dispatches `Execute(name, input)` across the three skill kinds.

pub mod cache;
pub mod executor;
pub mod loader;
pub mod registry;
pub mod types;

pub use cache::SkillCache;
pub use executor::SkillExecutor;
pub use loader::SkillLoader;
pub use registry::SkillRegistry;
pub use types::{SkillDefinition, SkillKind, SkillMetadata, SkillResult as SkillOutcome};

use thiserror::Error;

/// Errors produced by the skills subsystem.
#[derive(Debug, Error)]
pub enum SkillError {
    /// A requested skill name is not present in the registry.
    #[error("skill not found: {0}")]
    SkillNotFound(String),
    /// Input failed the skill's JSON Schema, or was otherwise malformed.
    #[error("input validation failed: {0}")]
    Validation(String),
    /// A `pure-script`/`hybrid` handler exceeded its timeout.
    #[error("handler for skill {name} timed out after {timeout_ms}ms")]
    HandlerTimeout {
        /// Skill name.
        name: String,
        /// Configured timeout.
        timeout_ms: u64,
    },
    /// A `pure-script`/`hybrid` handler ran but reported failure.
    #[error("handler for skill {name} failed: {detail}")]
    HandlerExecution {
        /// Skill name.
        name: String,
        /// Handler-reported detail.
        detail: String,
    },
    /// Directory scan for skill metadata failed outright.
    #[error("skill directory scan failed: {detail}")]
    ScanFailed {
        /// Human-readable detail.
        detail: String,
    },
    /// Metadata exists but the full definition could not be loaded.
    #[error("skill {name} has no loadable definition: {detail}")]
    MissingDefinition {
        /// Skill name.
        name: String,
        /// Human-readable detail.
        detail: String,
    },
    /// Filesystem IO error while reading a skill file.
    #[error("skill IO error: {0}")]
    Io(#[from] std::io::Error),
    /// `skill.yaml` failed to parse.
    #[error("skill.yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias for results inside the skills subsystem.
pub type SkillResult<T> = Result<T, SkillError>;
