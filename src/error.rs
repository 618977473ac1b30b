//! Closed set of error kinds surfaced across the runtime.
//!
//! Components keep their own `thiserror` enums (`SkillError`, `LlmError`,
//! `SandboxError`, `PtcError`) for the detail a caller inside that component
//! needs; this module is the boundary type every one of them collapses into,
//! matching the `kind`/`message` shape of `SkillResult.error` and
//! `Execute`'s response (spec.md §3, §6, §7).

use thiserror::Error;

/// The closed set of error kinds defined in spec.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    /// Input to `Execute` is malformed, or skill input fails schema check.
    Validation,
    /// `Acquire` called after `Shutdown`.
    ManagerClosed,
    /// Executor asked for a skill name not in the registry.
    SkillNotFound,
    /// PTC phase A (plan) LLM output not parseable.
    Planning,
    /// PTC phase B (implement) LLM output not parseable.
    Synthesis,
    /// Sandbox child exceeded its timeout, or an LLM call exceeded its deadline.
    Timeout,
    /// Sandbox child exited non-zero / threw, or a skill handler raised.
    Execution,
    /// Network/protocol/HTTP failure from the model endpoint.
    Llm,
    /// Anything else, caught at a component boundary.
    Internal,
}

/// A `{kind, message}` pair, the shape every component-local error converts
/// to at its public boundary (spec.md §3 `SkillResult.error`, §6 `Execute`
/// response `error`).
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("{kind:?}: {message}")]
pub struct RuntimeError {
    /// The closed error kind.
    pub kind: ErrorKind,
    /// Human-readable detail, safe to surface to a caller.
    pub message: String,
}

impl RuntimeError {
    /// Build a `RuntimeError` from a kind and a message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for `ErrorKind::Internal`, used at top-level boundaries that
    /// catch an unexpected error type.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl From<crate::skills::SkillError> for RuntimeError {
    fn from(err: crate::skills::SkillError) -> Self {
        use crate::skills::SkillError as E;
        let kind = match &err {
            E::SkillNotFound(_) => ErrorKind::SkillNotFound,
            E::Validation(_) => ErrorKind::Validation,
            E::HandlerTimeout { .. } => ErrorKind::Timeout,
            E::HandlerExecution { .. } | E::ScanFailed { .. } => ErrorKind::Execution,
            E::MissingDefinition { .. } | E::Io(_) | E::Yaml(_) => ErrorKind::Internal,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<crate::llm::LlmError> for RuntimeError {
    fn from(err: crate::llm::LlmError) -> Self {
        use crate::llm::LlmError as E;
        let kind = match &err {
            E::Timeout => ErrorKind::Timeout,
            E::Network(_) | E::Api(_) | E::Json(_) => ErrorKind::Llm,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<crate::sandbox::SandboxError> for RuntimeError {
    fn from(err: crate::sandbox::SandboxError) -> Self {
        use crate::sandbox::SandboxError as E;
        let kind = match &err {
            E::Timeout => ErrorKind::Timeout,
            E::Spawn(_) | E::Io(_) | E::NonZeroExit { .. } => ErrorKind::Execution,
            E::NotRunning => ErrorKind::Internal,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<crate::ptc::PtcError> for RuntimeError {
    fn from(err: crate::ptc::PtcError) -> Self {
        use crate::llm::LlmError;
        use crate::ptc::PtcError as E;
        let kind = match &err {
            E::Planning(_) => ErrorKind::Planning,
            E::Synthesis(_) => ErrorKind::Synthesis,
            E::Llm(LlmError::Timeout) => ErrorKind::Timeout,
            E::Llm(_) => ErrorKind::Llm,
        };
        Self::new(kind, err.to_string())
    }
}
