//! Prompt construction for PTC phases A (plan) and B (implement)
//! (spec.md §4.5).

use super::{GenerateOptions, HistoryEntry};
use crate::config::HISTORY_CONTEXT_WINDOW;
use crate::skills::{SkillDefinition, SkillMetadata};

fn history_block(history: &[HistoryEntry]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let tail_start = history.len().saturating_sub(HISTORY_CONTEXT_WINDOW);
    let lines: Vec<String> = history[tail_start..]
        .iter()
        .map(|entry| format!("{}: {}", entry.role, entry.content))
        .collect();
    format!("<conversation_history>\n{}\n</conversation_history>\n", lines.join("\n"))
}

fn variables_block(variables: &std::collections::HashMap<String, serde_json::Value>) -> String {
    if variables.is_empty() {
        return String::new();
    }
    let mut keys: Vec<&String> = variables.keys().collect();
    keys.sort();
    let lines: Vec<String> = keys
        .into_iter()
        .map(|k| format!("{k}: {}", variables[k]))
        .collect();
    format!("<available_variables>\n{}\n</available_variables>\n", lines.join("\n"))
}

/// Build the Phase A (plan / skill-selection) prompt.
#[must_use]
pub fn build_plan_prompt(skills: &[SkillMetadata], task: &str, options: &GenerateOptions) -> String {
    let mut skill_lines = String::new();
    for skill in skills {
        skill_lines.push_str(&format!("- {}: {}\n", skill.name, skill.description));
    }

    format!(
        "You are planning which skills to use for a task.\n\
<available_skills>\n{skill_lines}</available_skills>\n\
{history}{variables}<task>\n{task}\n</task>\n\
Respond with a JSON object inside a <plan> tag, with fields \
`selected_skills` (array of skill names) and `reasoning` (string). \
Example: <plan>{{\"selected_skills\": [\"skill-name\"], \"reasoning\": \"...\"}}</plan>",
        skill_lines = skill_lines,
        history = history_block(&options.history),
        variables = variables_block(&options.variables),
        task = task,
    )
}

/// Build the Phase B (implement / code-synthesis) prompt.
#[must_use]
pub fn build_implement_prompt(
    selected: &[std::sync::Arc<SkillDefinition>],
    task: &str,
    options: &GenerateOptions,
) -> String {
    let mut schema_lines = String::new();
    for def in selected {
        schema_lines.push_str(&format!(
            "- {name}\n  input_schema: {input}\n  output_schema: {output}\n",
            name = def.metadata.name,
            input = def.input_schema,
            output = def.output_schema,
        ));
    }

    format!(
        "You are writing a short Python program that calls skills via \
`await executor.execute(name, input)`.\n\
<skill_schemas>\n{schema_lines}</skill_schemas>\n\
{history}{variables}<task>\n{task}\n</task>\n\
Respond with exactly one code block, either fenced as ```python ... ``` or \
wrapped in <code>...</code>. Inside, call `await executor.execute('skill-name', {{...}})` \
for each skill you need, handle errors, and `print()` the final result.",
        schema_lines = schema_lines,
        history = history_block(&options.history),
        variables = variables_block(&options.variables),
        task = task,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn metadata(name: &str) -> SkillMetadata {
        SkillMetadata {
            name: name.to_string(),
            version: "1.0".to_string(),
            description: format!("does {name}"),
            tags: HashSet::new(),
            kind: crate::skills::types::SkillKind::PurePrompt,
            path: PathBuf::from("/tmp"),
        }
    }

    #[test]
    fn plan_prompt_omits_history_block_when_empty() {
        let prompt = build_plan_prompt(&[metadata("summarize")], "do it", &GenerateOptions::default());
        assert!(!prompt.contains("<conversation_history>"));
        assert!(prompt.contains("summarize"));
    }

    #[test]
    fn plan_prompt_includes_last_k_history_entries() {
        let history: Vec<HistoryEntry> = (0..10)
            .map(|i| HistoryEntry {
                role: "user".to_string(),
                content: format!("turn-{i}"),
            })
            .collect();
        let options = GenerateOptions {
            history,
            ..Default::default()
        };
        let prompt = build_plan_prompt(&[], "task", &options);
        assert!(prompt.contains("turn-9"));
        assert!(!prompt.contains("turn-0"));
    }
}
