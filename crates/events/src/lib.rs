//! Event system for the agent orchestrator
//!
//! Observers (chat views, status bars, the CLI) subscribe to the bus to follow
//! a session's state machine without polling the orchestrator.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;
