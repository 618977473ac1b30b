//! Parses `skill.yaml` files and discovers skill directories (spec.md §4.1, §6).

use super::types::{ExecutionDescriptor, SkillDefinition, SkillKind, SkillMetadata};
use super::{SkillError, SkillResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Permissive shape of `skill.yaml`: only the keys spec.md §6 names are
/// consumed, everything else is ignored by `serde(deny_unknown_fields)`
/// being absent.
#[derive(Debug, Deserialize)]
struct RawSkillYaml {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(alias = "type")]
    kind: Option<String>,
    #[serde(default, alias = "input_schema")]
    input_schema: Option<Value>,
    #[serde(default, alias = "output_schema")]
    output_schema: Option<Value>,
    #[serde(default, alias = "prompt_template")]
    prompt_template: Option<String>,
    #[serde(default)]
    execution: Option<RawExecution>,
}

#[derive(Debug, Deserialize)]
struct RawExecution {
    handler: Option<PathBuf>,
    function: Option<String>,
    timeout: Option<u64>,
}

fn read_skill_yaml(skill_dir: &Path) -> SkillResult<RawSkillYaml> {
    let yaml_path = skill_dir.join("skill.yaml");
    let text = std::fs::read_to_string(&yaml_path)?;
    let raw: RawSkillYaml = serde_yaml::from_str(&text)?;
    Ok(raw)
}

fn raw_to_metadata(skill_dir: &Path, raw: &RawSkillYaml) -> SkillMetadata {
    let kind = raw
        .kind
        .as_deref()
        .and_then(SkillKind::parse)
        .unwrap_or(SkillKind::PurePrompt);
    SkillMetadata {
        name: raw.name.clone(),
        version: raw.version.clone().unwrap_or_default(),
        description: raw.description.clone().unwrap_or_default(),
        tags: raw.tags.iter().cloned().collect::<HashSet<_>>(),
        kind,
        path: skill_dir.to_path_buf(),
    }
}

/// Discovers skill directories and parses `skill.yaml` contents.
#[derive(Debug, Clone)]
pub struct SkillLoader {
    skills_dir: PathBuf,
}

impl SkillLoader {
    /// Build a loader rooted at `skills_dir`.
    #[must_use]
    pub fn new(skills_dir: PathBuf) -> Self {
        Self { skills_dir }
    }

    /// Scan every direct subdirectory of `skills_dir` for a `skill.yaml`
    /// (spec.md §4.1). Subdirectories without one are skipped silently;
    /// malformed YAML is logged and skipped. Duplicate names resolve
    /// last-scanned-wins, with a warning.
    pub fn scan(&self) -> SkillResult<Vec<SkillMetadata>> {
        let entries = match std::fs::read_dir(&self.skills_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(SkillError::ScanFailed {
                    detail: err.to_string(),
                })
            }
        };

        let mut by_name: Vec<SkillMetadata> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| SkillError::ScanFailed {
                detail: err.to_string(),
            })?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if !path.join("skill.yaml").is_file() {
                continue;
            }
            let raw = match read_skill_yaml(&path) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping malformed skill.yaml");
                    continue;
                }
            };
            let metadata = raw_to_metadata(&path, &raw);
            if let Some(existing) = by_name.iter().position(|m| m.name == metadata.name) {
                warn!(name = %metadata.name, "duplicate skill name, last-scanned wins");
                by_name[existing] = metadata;
            } else {
                by_name.push(metadata);
            }
        }
        Ok(by_name)
    }

    /// Load the full definition for a skill whose metadata is already known.
    /// Re-reads `skill.yaml` for the level-2 keys (spec.md §3).
    pub fn load_definition(&self, metadata: SkillMetadata) -> SkillResult<SkillDefinition> {
        let raw = read_skill_yaml(&metadata.path)?;

        if metadata.kind == SkillKind::PurePrompt && raw.prompt_template.is_none() {
            return Err(SkillError::MissingDefinition {
                name: metadata.name.clone(),
                detail: "pure-prompt skill has no prompt_template".to_string(),
            });
        }

        let execution = raw.execution.as_ref().and_then(|e| {
            Some(ExecutionDescriptor {
                handler_file: e.handler.clone()?,
                function_name: e.function.clone()?,
                timeout_ms: e.timeout.unwrap_or_else(crate::config::get_skill_handler_timeout_ms),
            })
        });

        if metadata.kind.requires_execution() && execution.is_none() {
            return Err(SkillError::MissingDefinition {
                name: metadata.name.clone(),
                detail: format!("{:?} skill has no execution descriptor", metadata.kind),
            });
        }

        Ok(SkillDefinition {
            metadata,
            input_schema: raw.input_schema.unwrap_or_else(|| serde_json::json!({})),
            output_schema: raw.output_schema.unwrap_or_else(|| serde_json::json!({})),
            prompt_template: raw.prompt_template,
            execution,
        })
    }
}
