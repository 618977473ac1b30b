//! Session Manager: acquire/release/shutdown, idle sweeper, LRU eviction
//! (spec.md §4.7).

use crate::agent::state::now_ms;
use crate::agent::{Agent, AgentConfig};
use crate::error::{ErrorKind, RuntimeError};
use crate::llm::LlmClient;
use crate::ptc::PtcGenerator;
use crate::sandbox::LocalSandboxAdapter;
use crate::skills::SkillRegistry;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Tunables shared by every Agent the Manager constructs (spec.md §4.7).
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Idle timeout after which a session is swept.
    pub session_timeout_ms: u64,
    /// Cardinality bound; a new `Acquire` evicts the oldest session first.
    pub max_sessions: usize,
    /// Interval between sweeper passes.
    pub sweep_interval_ms: u64,
    /// Hard deadline bounding `Shutdown`'s cleanup fan-out.
    pub shutdown_deadline_ms: u64,
    /// Passed to every Agent constructed.
    pub agent_config: AgentConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            session_timeout_ms: crate::config::get_session_timeout_ms(),
            max_sessions: crate::config::get_max_sessions(),
            sweep_interval_ms: crate::config::get_sweep_interval_ms(),
            shutdown_deadline_ms: crate::config::get_shutdown_deadline_ms(),
            agent_config: AgentConfig::default(),
        }
    }
}

struct SessionEntry {
    agent: Arc<Agent>,
    last_activity_at_ms: u64,
    insertion_seq: u64,
}

struct ManagerInner {
    sessions: HashMap<String, SessionEntry>,
    closed: bool,
    next_seq: u64,
}

impl ManagerInner {
    /// The session with the oldest `last_activity_at_ms`, ties broken by
    /// insertion order (spec.md §4.7 LRU eviction).
    fn oldest_session_id(&self) -> Option<String> {
        self.sessions
            .iter()
            .min_by_key(|(_, entry)| (entry.last_activity_at_ms, entry.insertion_seq))
            .map(|(id, _)| id.clone())
    }
}

/// The only component that knows how many Agents exist (spec.md §4.7).
pub struct Manager {
    inner: Mutex<ManagerInner>,
    config: ManagerConfig,
    ptc: Arc<PtcGenerator>,
    sandbox: Arc<LocalSandboxAdapter>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Manager {
    /// Build a Manager from a shared registry and LLM client, and start its
    /// background idle sweeper.
    #[must_use]
    pub fn start(config: ManagerConfig, registry: Arc<SkillRegistry>, llm: LlmClient) -> Arc<Self> {
        let sandbox = Arc::new(LocalSandboxAdapter::from_env());
        let ptc = Arc::new(PtcGenerator::new(registry, llm));
        Self::start_with_components(config, ptc, sandbox)
    }

    /// Build a Manager from already-constructed PTC/sandbox components
    /// (used directly by tests that supply a mock LLM/sandbox).
    #[must_use]
    pub fn start_with_components(
        config: ManagerConfig,
        ptc: Arc<PtcGenerator>,
        sandbox: Arc<LocalSandboxAdapter>,
    ) -> Arc<Self> {
        let manager = Arc::new(Self {
            inner: Mutex::new(ManagerInner {
                sessions: HashMap::new(),
                closed: false,
                next_seq: 0,
            }),
            config,
            ptc,
            sandbox,
            sweeper: Mutex::new(None),
        });

        let weak: Weak<Manager> = Arc::downgrade(&manager);
        let interval = Duration::from_millis(manager.config.sweep_interval_ms);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                let Some(manager) = weak.upgrade() else { break };
                manager.sweep_once().await;
            }
        });
        // Nothing else holds the sweeper lock this early: the Arc hasn't
        // been returned to a caller yet, so contention here would mean the
        // invariant broke rather than a benign race worth swallowing.
        manager
            .sweeper
            .try_lock()
            .expect("sweeper mutex uncontended at construction time")
            .replace(handle);

        manager
    }

    /// Get-or-create the Agent bound to `session_id` (spec.md §4.7).
    ///
    /// LRU eviction only drops the Manager's own reference to the evicted
    /// Agent (spec.md §4.7: "the Manager merely drops its pointer") — it
    /// does not call `Agent::cleanup`. A caller already running that
    /// session holds its own `Arc<Agent>` and keeps it alive, sandbox child
    /// included, until that `Run` returns on its own.
    #[instrument(skip(self))]
    pub async fn acquire(&self, session_id: &str) -> Result<Arc<Agent>, RuntimeError> {
        let now = now_ms();

        let agent = {
            let mut guard = self.inner.lock().await;
            if guard.closed {
                return Err(RuntimeError::new(
                    ErrorKind::ManagerClosed,
                    "Acquire called after Shutdown",
                ));
            }

            if let Some(entry) = guard.sessions.get_mut(session_id) {
                entry.last_activity_at_ms = now;
                Arc::clone(&entry.agent)
            } else {
                if guard.sessions.len() >= self.config.max_sessions {
                    if let Some(oldest_id) = guard.oldest_session_id() {
                        // Just forget the entry; do not call `cleanup` on
                        // it (spec.md §4.7) in case it is mid-`Run`.
                        guard.sessions.remove(&oldest_id);
                    }
                }

                let seq = guard.next_seq;
                guard.next_seq += 1;
                let agent = Arc::new(Agent::new(
                    self.config.agent_config.clone(),
                    session_id.to_string(),
                    Arc::clone(&self.ptc),
                    Arc::clone(&self.sandbox),
                ));
                guard.sessions.insert(
                    session_id.to_string(),
                    SessionEntry {
                        agent: Arc::clone(&agent),
                        last_activity_at_ms: now,
                        insertion_seq: seq,
                    },
                );
                agent
            }
        };

        Ok(agent)
    }

    /// Remove and clean up `session_id`, if present (spec.md §4.7).
    #[instrument(skip(self))]
    pub async fn release(&self, session_id: &str) {
        let removed = {
            let mut guard = self.inner.lock().await;
            guard.sessions.remove(session_id).map(|entry| entry.agent)
        };
        if let Some(agent) = removed {
            agent.cleanup().await;
        }
    }

    /// Number of resident sessions. Never exceeds `maxSessions`.
    pub async fn count(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }

    /// Session ids currently resident (observability only).
    pub async fn active_sessions(&self) -> Vec<String> {
        self.inner.lock().await.sessions.keys().cloned().collect()
    }

    async fn sweep_once(&self) {
        let timed_out_at = now_ms().saturating_sub(self.config.session_timeout_ms);
        let expired: Vec<(String, Arc<Agent>)> = {
            let mut guard = self.inner.lock().await;
            let expired_ids: Vec<String> = guard
                .sessions
                .iter()
                .filter(|(_, entry)| entry.last_activity_at_ms <= timed_out_at)
                .map(|(id, _)| id.clone())
                .collect();
            expired_ids
                .into_iter()
                .filter_map(|id| guard.sessions.remove(&id).map(|entry| (id, entry.agent)))
                .collect()
        };

        for (session_id, agent) in expired {
            info!(session_id, "sweeping idle session");
            agent.cleanup().await;
        }
    }

    /// Stop the sweeper, clean up every resident Agent concurrently, and
    /// close the Manager to new `Acquire` calls. Idempotent; bounded by
    /// `shutdownDeadlineMs` (spec.md §5).
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let already_closed = {
            let mut guard = self.inner.lock().await;
            let was_closed = guard.closed;
            guard.closed = true;
            was_closed
        };
        if already_closed {
            return;
        }

        if let Some(handle) = self.sweeper.lock().await.take() {
            handle.abort();
        }

        let agents: Vec<Arc<Agent>> = {
            let mut guard = self.inner.lock().await;
            guard.sessions.drain().map(|(_, entry)| entry.agent).collect()
        };

        let mut set = tokio::task::JoinSet::new();
        for agent in agents {
            set.spawn(async move { agent.cleanup().await });
        }

        let deadline = Duration::from_millis(self.config.shutdown_deadline_ms);
        let drained = tokio::time::timeout(deadline, async {
            while set.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("shutdown deadline exceeded, some sessions may not have finished cleanup");
        }
    }
}
