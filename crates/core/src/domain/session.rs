use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::ExecutionContext;
use super::state::AgentState;

const TITLE_MAX_CHARS: usize = 60;

/// Lightweight session record kept alongside the full execution context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SessionDescriptor {
    pub id: String,
    pub title: String,
    pub state: AgentState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionDescriptor {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            state: AgentState::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Describe a context; the title is derived from the first input of the turn.
    pub fn from_context(ctx: &ExecutionContext, first_input: &str) -> Self {
        Self {
            id: ctx.session_id.clone(),
            title: Self::title_from_input(first_input),
            state: ctx.state,
            created_at: ctx.started_at,
            updated_at: ctx.updated_at,
        }
    }

    pub fn title_from_input(input: &str) -> String {
        let line = input.lines().next().unwrap_or_default().trim();
        line.chars().take(TITLE_MAX_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_context() {
        let mut ctx = ExecutionContext::new("ses_42", 3);
        ctx.record_transition(AgentState::Executing, None);

        let descriptor = SessionDescriptor::from_context(&ctx, "list files\nin the vault");
        assert_eq!(descriptor.id, "ses_42");
        assert_eq!(descriptor.title, "list files");
        assert_eq!(descriptor.state, AgentState::Executing);
        assert_eq!(descriptor.created_at, ctx.started_at);
    }

    #[test]
    fn test_title_is_truncated() {
        let long = "x".repeat(200);
        assert_eq!(SessionDescriptor::title_from_input(&long).len(), 60);
        assert_eq!(SessionDescriptor::title_from_input(""), "");
    }
}
