//! Local-subprocess sandbox adapter (spec.md §4.4, the one concrete
//! "remote sandbox" backend the spec requires).
//!
//! Grounded on the teacher's `sandbox/manager.rs` for instrumentation and
//! child-process bookkeeping style, and on the timeout/truncation pattern
//! used for subprocess execution in the pack's `exec` crate — reimplemented
//! here without `unsafe` (no pre-exec hooks), spawning `kill -TERM` as an
//! ordinary child process for the graceful-termination step instead of a
//! raw signal call.

use super::wrap::wrap_code;
use super::{ExecuteOptions, SandboxError, SandboxErrorDetail, SandboxResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::utils::elapsed_ms;

/// Caps how much of one stream is retained in memory.
struct CappedBuffer {
    buf: Vec<u8>,
    cap: usize,
    truncated: bool,
}

impl CappedBuffer {
    fn new(cap: usize) -> Self {
        Self {
            buf: Vec::new(),
            cap,
            truncated: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        if self.buf.len() >= self.cap {
            self.truncated = true;
            return;
        }
        let remaining = self.cap - self.buf.len();
        if chunk.len() > remaining {
            self.buf.extend_from_slice(&chunk[..remaining]);
            self.truncated = true;
        } else {
            self.buf.extend_from_slice(chunk);
        }
    }

    fn into_string(self) -> String {
        let mut text = String::from_utf8_lossy(&self.buf).into_owned();
        if self.truncated {
            text.push_str(crate::config::SANDBOX_TRUNCATION_MARKER);
        }
        text
    }
}

async fn drain_capped<R: tokio::io::AsyncRead + Unpin>(mut reader: R, cap: usize) -> String {
    let mut capped = CappedBuffer::new(cap);
    let mut chunk = [0_u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => capped.push(&chunk[..n]),
            Err(_) => break,
        }
    }
    capped.into_string()
}

/// Owns one child interpreter process per session.
pub struct LocalSandboxAdapter {
    workspace_root: PathBuf,
    interpreter_path: String,
    output_cap_bytes: usize,
    kill_grace: Duration,
    children: Mutex<HashMap<String, Arc<Mutex<Child>>>>,
}

impl LocalSandboxAdapter {
    /// Build an adapter rooted at `workspace_root`.
    #[must_use]
    pub fn new(workspace_root: PathBuf, interpreter_path: String) -> Self {
        Self {
            workspace_root,
            interpreter_path,
            output_cap_bytes: crate::config::get_sandbox_output_cap_bytes(),
            kill_grace: Duration::from_millis(crate::config::get_sandbox_kill_grace_ms()),
            children: Mutex::new(HashMap::new()),
        }
    }

    /// Build an adapter from environment configuration.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(
            PathBuf::from(crate::config::get_sandbox_workspace_root()),
            crate::config::get_interpreter_path(),
        )
    }

    fn workspace_dir(&self, session_id: &str) -> PathBuf {
        self.workspace_root.join(session_id)
    }

    /// Run `code` for `options.session_id`, per spec.md §4.4 steps 1-7.
    #[instrument(skip(self, code), fields(session_id = %options.session_id))]
    pub async fn execute(&self, code: &str, options: ExecuteOptions) -> SandboxResult {
        let start = Instant::now();

        if options.timeout_ms == 0 {
            return timeout_result(start);
        }

        let workspace_dir = self.workspace_dir(&options.session_id);
        if let Err(err) = tokio::fs::create_dir_all(&workspace_dir).await {
            return io_error_result(start, err.to_string());
        }

        let binary_path = options.runtime_binary_path.clone().unwrap_or_else(|| {
            std::env::current_exe().unwrap_or_else(|_| PathBuf::from("agent-runtime-core"))
        });
        let wrapped = wrap_code(code, &options.skill_impl_path, &binary_path);

        let file_path = workspace_dir.join(format!("{}_{}.py", options.session_id, Uuid::new_v4()));
        if let Err(err) = tokio::fs::write(&file_path, &wrapped).await {
            return io_error_result(start, err.to_string());
        }

        let result = self.run_wrapped_file(&options, &workspace_dir, &file_path, start).await;
        let _ = tokio::fs::remove_file(&file_path).await;
        self.children.lock().await.remove(&options.session_id);
        result
    }

    async fn run_wrapped_file(
        &self,
        options: &ExecuteOptions,
        workspace_dir: &std::path::Path,
        file_path: &std::path::Path,
        start: Instant,
    ) -> SandboxResult {
        let mut command = Command::new(&self.interpreter_path);
        command
            .arg(file_path)
            .current_dir(workspace_dir)
            .env("PYTHONPATH", &options.skill_impl_path)
            .env("AGENT_SESSION_ID", &options.session_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &options.env {
            command.env(key, value);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => return spawn_error_result(start, err.to_string()),
        };
        let pid = child.id();
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return spawn_error_result(start, "child produced no stdout/stderr pipe".to_string());
        };

        let child = Arc::new(Mutex::new(child));
        self.children
            .lock()
            .await
            .insert(options.session_id.clone(), Arc::clone(&child));

        let stdout_task = tokio::spawn(drain_capped(stdout, self.output_cap_bytes));
        let stderr_task = tokio::spawn(drain_capped(stderr, self.output_cap_bytes));

        let wait_result = {
            let mut guard = child.lock().await;
            tokio::time::timeout(Duration::from_millis(options.timeout_ms), guard.wait()).await
        };

        if wait_result.is_err() {
            // Kill before draining: a hung child keeps its pipes open past
            // timeout_ms, so awaiting the drain tasks first would block this
            // call on the child's own lifetime instead of enforcing the
            // deadline.
            self.kill_with_grace(pid, &child).await;
        }

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        match wait_result {
            Ok(Ok(status)) => {
                let exit_code = status.code();
                let success = exit_code == Some(0);
                SandboxResult {
                    success,
                    stdout,
                    stderr,
                    exit_code,
                    error: if success {
                        None
                    } else {
                        Some(SandboxErrorDetail {
                            kind: "Execution".to_string(),
                            message: format!("process exited with status {status}"),
                        })
                    },
                    execution_time_ms: elapsed_ms(start),
                }
            }
            Ok(Err(err)) => io_error_result(start, err.to_string()),
            Err(_) => timeout_result(start)
        }
    }

    async fn kill_with_grace(&self, pid: Option<u32>, child: &Arc<Mutex<Child>>) {
        if let Some(pid) = pid {
            let _ = Command::new("kill")
                .arg("-TERM")
                .arg(pid.to_string())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
        }

        let graceful_exit = {
            let mut guard = child.lock().await;
            tokio::time::timeout(self.kill_grace, guard.wait()).await
        };

        if graceful_exit.is_err() {
            let mut guard = child.lock().await;
            let _ = guard.start_kill();
            let _ = guard.wait().await;
        }
    }

    /// Terminate any live child for `session_id` and remove its workspace
    /// (spec.md §4.4).
    #[instrument(skip(self))]
    pub async fn cleanup(&self, session_id: &str) -> Result<(), SandboxError> {
        let child = self.children.lock().await.remove(session_id);
        if let Some(child) = child {
            let pid = child.lock().await.id();
            self.kill_with_grace(pid, &child).await;
        }

        let workspace_dir = self.workspace_dir(session_id);
        if workspace_dir.exists() {
            if let Err(err) = tokio::fs::remove_dir_all(&workspace_dir).await {
                warn!(session_id, error = %err, "failed to remove sandbox workspace");
                return Err(SandboxError::Io(err.to_string()));
            }
        }
        Ok(())
    }

    /// Verify the interpreter binary is reachable (spec.md §4.4).
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> bool {
        Command::new(&self.interpreter_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

fn timeout_result(start: Instant) -> SandboxResult {
    SandboxResult {
        success: false,
        stdout: String::new(),
        stderr: String::new(),
        exit_code: None,
        error: Some(SandboxErrorDetail {
            kind: "Timeout".to_string(),
            message: "sandbox execution timed out".to_string(),
        }),
        execution_time_ms: elapsed_ms(start),
    }
}

fn spawn_error_result(start: Instant, detail: String) -> SandboxResult {
    SandboxResult {
        success: false,
        stdout: String::new(),
        stderr: String::new(),
        exit_code: None,
        error: Some(SandboxErrorDetail {
            kind: "Execution".to_string(),
            message: format!("failed to spawn interpreter: {detail}"),
        }),
        execution_time_ms: elapsed_ms(start),
    }
}

fn io_error_result(start: Instant, detail: String) -> SandboxResult {
    SandboxResult {
        success: false,
        stdout: String::new(),
        stderr: String::new(),
        exit_code: None,
        error: Some(SandboxErrorDetail {
            kind: "Execution".to_string(),
            message: detail,
        }),
        execution_time_ms: elapsed_ms(start),
    }
}
