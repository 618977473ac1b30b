//! Per-session orchestrator: state, history, variable store, one call per
//! run (spec.md §4.6).

pub mod agent;
pub mod state;

pub use agent::{Agent, AgentConfig, AgentResult};
pub use state::{ConversationMessage, ConversationRole, ExecutionRecord, SessionState};
