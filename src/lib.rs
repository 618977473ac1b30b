//! Session-scoped agent runtime core: a Session Manager fronting per-session
//! Agents that synthesize and run short-lived sandboxed code against a
//! registry of declarative skills.

pub mod agent;
pub mod config;
pub mod error;
pub mod handler;
pub mod llm;
pub mod manager;
pub mod ptc;
pub mod sandbox;
pub mod skills;
pub mod utils;
