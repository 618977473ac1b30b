//! Sandbox adapter: one child interpreter process per session (spec.md
//! §4.4).

pub mod local;
pub mod wrap;

pub use local::LocalSandboxAdapter;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the sandbox adapter.
#[derive(Debug, Error, Clone)]
pub enum SandboxError {
    /// The child process exceeded `timeoutMs` and was killed.
    #[error("sandbox execution timed out")]
    Timeout,
    /// The interpreter could not be spawned at all.
    #[error("failed to spawn interpreter: {0}")]
    Spawn(String),
    /// Workspace/file IO failure.
    #[error("sandbox IO error: {0}")]
    Io(String),
    /// The child exited non-zero with no structured error of its own.
    #[error("sandbox process exited with status {status}")]
    NonZeroExit {
        /// The exit status as reported by the OS.
        status: String,
    },
    /// `Cleanup`/`Execute` referenced a sessionId with no running child.
    #[error("no running child process for this session")]
    NotRunning,
}

/// The result of `Execute` (spec.md §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxResult {
    /// True only when the process exited zero.
    pub success: bool,
    /// Captured standard output, possibly truncated.
    pub stdout: String,
    /// Captured standard error, possibly truncated.
    pub stderr: String,
    /// Process exit code, if the process actually exited.
    pub exit_code: Option<i32>,
    /// Structured error, present when `!success`.
    pub error: Option<SandboxErrorDetail>,
    /// Wall-clock execution time in milliseconds.
    pub execution_time_ms: u64,
}

/// A `{kind, message}` error surfaced on `SandboxResult` (spec.md §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxErrorDetail {
    /// The error kind string (`Timeout`, `Execution`).
    pub kind: String,
    /// Human-readable detail.
    pub message: String,
}

/// Inputs to `Execute` (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// The session this execution belongs to.
    pub session_id: String,
    /// Wall-clock timeout for the child process.
    pub timeout_ms: u64,
    /// Directory containing skill handler implementations, prepended to the
    /// interpreter's module search path.
    pub skill_impl_path: std::path::PathBuf,
    /// Additional environment variable overrides, applied last.
    pub env: Vec<(String, String)>,
    /// Override for the binary the sandbox's `SkillExecutor` shim shells
    /// out to (spec.md §9 subprocess-per-skill). Defaults to the current
    /// executable when `None`.
    pub runtime_binary_path: Option<std::path::PathBuf>,
}
