use agent_core::AgentState;

use crate::error::{OrchestratorError, Result};

/// Legal edges of the per-session state machine.
///
/// ```text
/// Planning   -> Executing
/// Executing  -> Validating | Retrying | Completed | Failed
/// Validating -> Executing | Completed | Retrying | Failed
/// Retrying   -> Executing
/// any non-terminal -> Failed     (error caught by the loop)
/// any        -> Cancelled        (user cancellation)
/// ```
///
/// Cancellation is accepted from terminal states too: cancelling a finished
/// session still records the Cancelled transition.
pub struct AgentStateMachine;

impl AgentStateMachine {
    pub fn validate_transition(from: AgentState, to: AgentState) -> Result<()> {
        if Self::can_transition(from, to) {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidTransition { from, to })
        }
    }

    pub fn can_transition(from: AgentState, to: AgentState) -> bool {
        if to == AgentState::Cancelled {
            return true;
        }
        if to == AgentState::Failed {
            return !from.is_terminal();
        }
        Self::allowed_transitions(from).contains(&to)
    }

    fn allowed_transitions(from: AgentState) -> &'static [AgentState] {
        match from {
            AgentState::Planning => &[AgentState::Executing],
            AgentState::Executing => &[
                AgentState::Validating,
                AgentState::Retrying,
                AgentState::Completed,
            ],
            AgentState::Validating => &[
                AgentState::Executing,
                AgentState::Completed,
                AgentState::Retrying,
            ],
            AgentState::Retrying => &[AgentState::Executing],
            AgentState::Completed | AgentState::Cancelled | AgentState::Failed => &[],
        }
    }

    /// Check a recorded walk, e.g. [`agent_core::ExecutionContext::state_path`].
    pub fn is_valid_path(path: &[AgentState]) -> bool {
        path.windows(2)
            .all(|pair| Self::can_transition(pair[0], pair[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AgentState::*;

    #[test]
    fn test_valid_transitions() {
        assert!(AgentStateMachine::can_transition(Planning, Executing));
        assert!(AgentStateMachine::can_transition(Executing, Validating));
        assert!(AgentStateMachine::can_transition(Executing, Retrying));
        assert!(AgentStateMachine::can_transition(Executing, Completed));
        assert!(AgentStateMachine::can_transition(Validating, Executing));
        assert!(AgentStateMachine::can_transition(Validating, Completed));
        assert!(AgentStateMachine::can_transition(Validating, Retrying));
        assert!(AgentStateMachine::can_transition(Retrying, Executing));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!AgentStateMachine::can_transition(Planning, Validating));
        assert!(!AgentStateMachine::can_transition(Planning, Completed));
        assert!(!AgentStateMachine::can_transition(Retrying, Validating));
        assert!(!AgentStateMachine::can_transition(Retrying, Completed));
        assert!(!AgentStateMachine::can_transition(Validating, Validating));
        assert!(AgentStateMachine::validate_transition(Planning, Retrying).is_err());
    }

    #[test]
    fn test_terminal_states_only_allow_cancellation() {
        for terminal in [Completed, Cancelled, Failed] {
            for to in AgentState::ALL {
                let allowed = AgentStateMachine::can_transition(terminal, to);
                assert_eq!(allowed, to == Cancelled, "{terminal} -> {to}");
            }
        }
    }

    #[test]
    fn test_failure_and_cancellation_from_any_active_state() {
        for from in [Planning, Executing, Validating, Retrying] {
            assert!(AgentStateMachine::can_transition(from, Failed));
            assert!(AgentStateMachine::can_transition(from, Cancelled));
        }
    }

    #[test]
    fn test_path_validation() {
        assert!(AgentStateMachine::is_valid_path(&[
            Planning, Executing, Retrying, Executing, Validating, Completed
        ]));
        assert!(!AgentStateMachine::is_valid_path(&[
            Planning, Validating, Completed
        ]));
        assert!(AgentStateMachine::is_valid_path(&[]));
    }
}
