//! Event types published by the orchestrator

use agent_core::AgentState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// All events emitted while driving a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A fresh execution context was created for a session
    #[serde(rename = "context.created")]
    ContextCreated { session_id: String },

    /// The session's state machine moved
    #[serde(rename = "context.state_changed")]
    StateChanged {
        session_id: String,
        from: AgentState,
        to: AgentState,
        reason: Option<String>,
    },

    /// Planning produced a plan
    #[serde(rename = "plan.created")]
    PlanCreated {
        session_id: String,
        plan_id: Uuid,
        steps: usize,
    },

    /// A step was marked in-progress
    #[serde(rename = "step.started")]
    StepStarted {
        session_id: String,
        step_id: Uuid,
        index: usize,
    },

    /// A step finished executing (before validation)
    #[serde(rename = "step.finished")]
    StepFinished {
        session_id: String,
        step_id: Uuid,
        success: bool,
    },

    /// The user cancelled the session
    #[serde(rename = "session.cancelled")]
    SessionCancelled { session_id: String },

    /// A turn reached a terminal state
    #[serde(rename = "turn.finished")]
    TurnFinished {
        session_id: String,
        state: AgentState,
    },

    /// Generic error event
    #[serde(rename = "error")]
    Error {
        session_id: Option<String>,
        message: String,
    },
}

impl Event {
    /// Get the session ID associated with this event, if any
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Event::ContextCreated { session_id }
            | Event::StateChanged { session_id, .. }
            | Event::PlanCreated { session_id, .. }
            | Event::StepStarted { session_id, .. }
            | Event::StepFinished { session_id, .. }
            | Event::SessionCancelled { session_id }
            | Event::TurnFinished { session_id, .. } => Some(session_id),
            Event::Error { session_id, .. } => session_id.as_deref(),
        }
    }
}
