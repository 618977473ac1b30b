//! Session state data model (spec.md §3, §5).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::collections::VecDeque;

/// Current wall-clock time in milliseconds since the epoch.
#[must_use]
pub fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    /// The task/follow-up that triggered this `Run`.
    User,
    /// The Agent's recorded response.
    Assistant,
}

/// One turn of session history (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Who produced this turn.
    pub role: ConversationRole,
    /// Turn content.
    pub content: String,
    /// When this turn was recorded.
    pub timestamp_ms: u64,
}

/// One completed `Run` (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// The task text that was run.
    pub task: String,
    /// The sandbox's final output, if any.
    pub output: Option<Value>,
    /// When the run completed.
    pub timestamp_ms: u64,
    /// Wall-clock run duration, in milliseconds.
    pub duration_ms: u64,
}

/// A bounded observability snapshot returned on every `Run` (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSummary {
    /// Cumulative conversation length, even if the in-memory list is trimmed.
    pub conversation_length: usize,
    /// Cumulative execution count.
    pub execution_count: usize,
    /// Number of distinct variable keys currently set.
    pub variables_count: usize,
}

/// Owned exclusively by one Agent, bound to one sessionId (spec.md §3).
#[derive(Debug, Clone)]
pub struct SessionState {
    /// The session this state belongs to.
    pub session_id: String,
    /// When the Agent was first minted for this session.
    pub created_at_ms: u64,
    /// Updated on every `Acquire` and at the start of every `Run`.
    pub last_activity_at_ms: u64,
    conversation: VecDeque<ConversationMessage>,
    executions: VecDeque<ExecutionRecord>,
    variables: HashMap<String, Value>,
    conversation_total: usize,
    execution_total: usize,
    max_conversation_entries: usize,
    max_execution_records: usize,
}

impl SessionState {
    /// Build fresh, empty state for `session_id`.
    #[must_use]
    pub fn new(session_id: String, max_conversation_entries: usize, max_execution_records: usize) -> Self {
        let now = now_ms();
        Self {
            session_id,
            created_at_ms: now,
            last_activity_at_ms: now,
            conversation: VecDeque::new(),
            executions: VecDeque::new(),
            variables: HashMap::new(),
            conversation_total: 0,
            execution_total: 0,
            max_conversation_entries,
            max_execution_records,
        }
    }

    /// Record activity now.
    pub fn touch(&mut self) {
        self.last_activity_at_ms = now_ms();
    }

    /// Append a conversation turn, enforcing the bound (spec.md §5).
    pub fn push_conversation(&mut self, role: ConversationRole, content: impl Into<String>) {
        self.conversation.push_back(ConversationMessage {
            role,
            content: content.into(),
            timestamp_ms: now_ms(),
        });
        self.conversation_total += 1;
        while self.conversation.len() > self.max_conversation_entries {
            self.conversation.pop_front();
        }
    }

    /// Append an execution record, enforcing the bound (spec.md §5).
    pub fn push_execution(&mut self, task: impl Into<String>, output: Option<Value>, duration_ms: u64) {
        self.executions.push_back(ExecutionRecord {
            task: task.into(),
            output,
            timestamp_ms: now_ms(),
            duration_ms,
        });
        self.execution_total += 1;
        while self.executions.len() > self.max_execution_records {
            self.executions.pop_front();
        }
    }

    /// Set a variable; last-write-wins (spec.md §3).
    pub fn set_variable(&mut self, key: impl Into<String>, value: Value) {
        self.variables.insert(key.into(), value);
    }

    /// Read a variable.
    #[must_use]
    pub fn get_variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    /// Merge entries from a sandbox-emitted `variables` object
    /// (spec.md §4.6 step 4, §9: optional, last-write-wins).
    pub fn merge_variables(&mut self, updates: &serde_json::Map<String, Value>) {
        for (key, value) in updates {
            self.variables.insert(key.clone(), value.clone());
        }
    }

    /// The in-memory (possibly trimmed) conversation slice.
    #[must_use]
    pub fn conversation(&self) -> &VecDeque<ConversationMessage> {
        &self.conversation
    }

    /// Current variable snapshot, for PTC context (spec.md §4.6 step 2).
    #[must_use]
    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    /// Bounded observability snapshot (spec.md §6 `state`).
    #[must_use]
    pub fn summary(&self) -> StateSummary {
        StateSummary {
            conversation_length: self.conversation_total,
            execution_count: self.execution_total,
            variables_count: self.variables.len(),
        }
    }

    /// Discard all conversation/execution/variable state in place
    /// (spec.md §4.6 `Cleanup`).
    pub fn clear(&mut self) {
        self.conversation.clear();
        self.executions.clear();
        self.variables.clear();
        self.conversation_total = 0;
        self.execution_total = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_conversation_trims_but_keeps_cumulative_count() {
        let mut state = SessionState::new("s1".to_string(), 2, 50);
        for i in 0..5 {
            state.push_conversation(ConversationRole::User, format!("turn-{i}"));
        }
        assert_eq!(state.conversation().len(), 2);
        assert_eq!(state.summary().conversation_length, 5);
    }

    #[test]
    fn set_then_get_variable_roundtrips() {
        let mut state = SessionState::new("s1".to_string(), 100, 50);
        state.set_variable("k", serde_json::json!(42));
        assert_eq!(state.get_variable("k"), Some(&serde_json::json!(42)));
    }

    #[test]
    fn clear_resets_cumulative_counters() {
        let mut state = SessionState::new("s1".to_string(), 100, 50);
        state.push_conversation(ConversationRole::User, "hi");
        state.set_variable("k", serde_json::json!(1));
        state.clear();
        let summary = state.summary();
        assert_eq!(summary.conversation_length, 0);
        assert_eq!(summary.variables_count, 0);
    }
}
