//! Conversation orchestration for the Dash assistant.
//!
//! [`Agent`] owns the chat state, drives the model/tool round loop, and
//! persists every mutation through a [`dash_storage::RecordStore`]. Consumers
//! observe progress through the broadcast event stream and the loading flag.

pub mod agent;
pub mod config;
mod runner;

pub use agent::Agent;
pub use config::{AgentConfig, DEFAULT_SYSTEM_PROMPT};
