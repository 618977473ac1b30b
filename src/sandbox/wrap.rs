//! Code wrapping: turns a PTC-generated snippet into a complete program
//! (spec.md §4.4 step 1, §9 "dynamic code loading").
//!
//! The snippet is written *as if* inside an `async main()` with an in-scope
//! `executor` variable (spec.md §9). The embedded `SkillExecutor` class is a
//! thin bootstrap shim: it does not contain any skill dispatch logic itself,
//! it shells out to this same binary's hidden `__skill-exec` subcommand,
//! which is backed by the real `skills::SkillExecutor` in Rust. This keeps
//! all application logic in Rust while still satisfying the PTC contract
//! that `executor.execute(name, input)` is callable from the sandboxed
//! snippet (spec.md §9: "Implementers free to choose plugin style vs.
//! subprocess-per-skill"). `execute` returns the skill's raw output on
//! success or `{"error": {...}}` on a skill-level failure; it only raises
//! when the subcommand itself crashes (spec.md §8 scenario 5: a
//! `SkillNotFound` is a value the synthesized code observes, not an
//! exception it has to catch).

use std::path::Path;

const SKILL_EXEC_SUBCOMMAND: &str = "__skill-exec";

/// Wrap `snippet` into a complete, runnable Python program.
#[must_use]
pub fn wrap_code(snippet: &str, skill_impl_path: &Path, binary_path: &Path) -> String {
    let indented = indent_lines(snippet, 8);
    format!(
        r#"import sys
import os
import json
import asyncio
import subprocess

sys.path.insert(0, {skill_impl_path})

class SkillExecutor:
    async def execute(self, name, input):
        proc = await asyncio.create_subprocess_exec(
            {binary_path}, "{subcommand}", name,
            stdin=asyncio.subprocess.PIPE,
            stdout=asyncio.subprocess.PIPE,
            stderr=asyncio.subprocess.PIPE,
        )
        stdout, stderr = await proc.communicate(json.dumps(input).encode("utf-8"))
        if proc.returncode != 0:
            raise RuntimeError(stderr.decode("utf-8", "replace"))
        result = json.loads(stdout.decode("utf-8"))
        if result.get("success"):
            return result.get("output")
        return {{"error": result.get("error")}}


async def __ptc_main():
    executor = SkillExecutor()
    try:
{indented}
    except Exception as e:
        print(json.dumps({{"error": {{"kind": "Execution", "message": str(e)}}}}))


asyncio.run(__ptc_main())
"#,
        skill_impl_path = py_str(skill_impl_path),
        binary_path = py_str(binary_path),
        subcommand = SKILL_EXEC_SUBCOMMAND,
        indented = indented,
    )
}

fn py_str(path: &Path) -> String {
    format!("{:?}", path.to_string_lossy())
}

fn indent_lines(text: &str, spaces: usize) -> String {
    let prefix = " ".repeat(spaces);
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn wrap_code_embeds_snippet_indented_inside_try_block() {
        let wrapped = wrap_code(
            "r = await executor.execute('summarize', {'content': 'hi'})\nprint(r)",
            &PathBuf::from("/work/skills"),
            &PathBuf::from("/usr/bin/agent-runtime-core"),
        );
        assert!(wrapped.contains("class SkillExecutor:"));
        assert!(wrapped.contains("        r = await executor.execute"));
        assert!(wrapped.contains("        print(r)"));
        assert!(wrapped.contains("asyncio.run(__ptc_main())"));
        assert!(wrapped.contains("__skill-exec"));
    }

    #[test]
    fn wrap_code_inserts_skill_impl_path_onto_sys_path() {
        let wrapped = wrap_code("pass", &PathBuf::from("/work/skills"), &PathBuf::from("/bin/x"));
        assert!(wrapped.contains("sys.path.insert(0,"));
        assert!(wrapped.contains("/work/skills"));
    }

    #[test]
    fn wrap_code_preserves_blank_lines_without_trailing_whitespace() {
        let wrapped = wrap_code("a = 1\n\nb = 2", &PathBuf::from("/x"), &PathBuf::from("/bin/x"));
        assert!(wrapped.lines().any(|l| l.is_empty()));
    }
}
