use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plan::{StepResult, TaskPlan, TaskStep};
use super::state::AgentState;

/// One recorded state change. The log is append-only and ordered by
/// insertion, not by timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct StateTransition {
    pub from: AgentState,
    pub to: AgentState,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Per-session aggregate driven by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ExecutionContext {
    pub session_id: String,
    pub state: AgentState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<TaskPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_index: Option<usize>,
    #[serde(default)]
    pub step_results: Vec<StepResult>,
    #[serde(default)]
    pub transitions: Vec<StateTransition>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl ExecutionContext {
    pub fn new(session_id: impl Into<String>, max_retries: u32) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            state: AgentState::Planning,
            plan: None,
            current_step_index: None,
            step_results: Vec::new(),
            transitions: Vec::new(),
            started_at: now,
            updated_at: now,
            completed_at: None,
            retry_count: 0,
            max_retries,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Append a transition and move to `to`. No edge checking happens here;
    /// the orchestrator's state machine validates before calling this.
    pub fn record_transition(&mut self, to: AgentState, reason: Option<String>) {
        let now = Utc::now();
        self.transitions.push(StateTransition {
            from: self.state,
            to,
            timestamp: now,
            reason,
        });
        self.state = to;
        self.updated_at = now;
        if to.is_terminal() {
            self.completed_at = Some(now);
        }
    }

    pub fn last_transition(&self) -> Option<&StateTransition> {
        self.transitions.last()
    }

    /// Index of the step being worked on; an unset cursor means the first step.
    pub fn step_index(&self) -> usize {
        self.current_step_index.unwrap_or(0)
    }

    pub fn current_step(&self) -> Option<&TaskStep> {
        let index = self.step_index();
        self.plan.as_ref().and_then(|plan| plan.step(index))
    }

    pub fn current_step_mut(&mut self) -> Option<&mut TaskStep> {
        let index = self.step_index();
        self.plan.as_mut().and_then(|plan| plan.step_mut(index))
    }

    pub fn last_result(&self) -> Option<&StepResult> {
        self.step_results.last()
    }

    pub fn last_result_mut(&mut self) -> Option<&mut StepResult> {
        self.step_results.last_mut()
    }

    /// The sequence of states walked so far, starting with the first `from`.
    pub fn state_path(&self) -> Vec<AgentState> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.first() {
            path.push(first.from);
        }
        path.extend(self.transitions.iter().map(|t| t.to));
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context() {
        let ctx = ExecutionContext::new("ses_1", 3);
        assert_eq!(ctx.session_id, "ses_1");
        assert_eq!(ctx.state, AgentState::Planning);
        assert!(ctx.plan.is_none());
        assert_eq!(ctx.step_index(), 0);
        assert!(ctx.transitions.is_empty());
        assert!(ctx.completed_at.is_none());
        assert_eq!(ctx.max_retries, 3);
    }

    #[test]
    fn test_record_transition() {
        let mut ctx = ExecutionContext::new("ses_1", 3);
        ctx.record_transition(AgentState::Executing, Some("Plan created".to_string()));
        assert_eq!(ctx.state, AgentState::Executing);
        assert!(ctx.completed_at.is_none());

        ctx.record_transition(AgentState::Failed, Some("boom".to_string()));
        assert!(ctx.is_terminal());
        assert!(ctx.completed_at.is_some());

        let last = ctx.last_transition().unwrap();
        assert_eq!(last.from, AgentState::Executing);
        assert_eq!(last.to, AgentState::Failed);
        assert_eq!(last.reason.as_deref(), Some("boom"));
        assert_eq!(
            ctx.state_path(),
            vec![
                AgentState::Planning,
                AgentState::Executing,
                AgentState::Failed
            ]
        );
    }

    #[test]
    fn test_current_step_follows_cursor() {
        let mut ctx = ExecutionContext::new("ses_1", 3);
        assert!(ctx.current_step().is_none());

        ctx.plan = Some(TaskPlan::new(
            "goal",
            vec![TaskStep::new("first", "c", 1), TaskStep::new("second", "c", 1)],
        ));
        assert_eq!(ctx.current_step().unwrap().description, "first");

        ctx.current_step_index = Some(1);
        assert_eq!(ctx.current_step().unwrap().description, "second");

        ctx.current_step_index = Some(2);
        assert!(ctx.current_step_mut().is_none());
    }

    #[test]
    fn test_json_round_trip_is_structurally_equal() {
        let mut ctx = ExecutionContext::new("ses_rt", 2);
        ctx.plan = Some(TaskPlan::new("goal", vec![TaskStep::new("a", "b", 2)]));
        let step_id = ctx.current_step().unwrap().id;
        ctx.step_results.push(StepResult::failed(step_id, "nope"));
        ctx.record_transition(AgentState::Executing, None);

        let json = serde_json::to_string(&ctx).unwrap();
        let restored: ExecutionContext = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, ctx);
    }
}
