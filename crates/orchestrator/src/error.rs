use agent_core::AgentState;
use thiserror::Error;

/// Failures raised while driving a session.
///
/// A step that runs but misses its success criterion is not an error; see
/// [`crate::validation::Validation`].
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("Step execution failed: {0}")]
    StepExecution(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Context retrieval failed: {0}")]
    Retrieval(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: AgentState, to: AgentState },

    #[error("No handler for terminal state {0}")]
    TerminalState(AgentState),

    #[error("No plan to work on")]
    MissingPlan,

    #[error("Plan has no step at index {index}")]
    MissingStep { index: usize },

    #[error("No step result to validate")]
    MissingStepResult,

    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OrchestratorError {
    pub fn persistence(reason: impl std::fmt::Display) -> Self {
        Self::Persistence(reason.to_string())
    }

    /// Whether this failure consumes a step's retry budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StepExecution(_))
    }
}

impl From<opencode::OpenCodeError> for OrchestratorError {
    fn from(e: opencode::OpenCodeError) -> Self {
        Self::Backend(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
