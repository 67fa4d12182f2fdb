//! Validating: check the last step result against the step's success
//! criteria and move the cursor forward or spend a retry.

use agent_core::{AgentState, ExecutionContext, StepStatus};
use async_trait::async_trait;
use tracing::{info, warn};

use super::{Advance, AgentServices, StateHandler};
use crate::error::{OrchestratorError, Result};
use crate::validation::validate_step_result;

pub struct ValidatingHandler;

#[async_trait]
impl StateHandler for ValidatingHandler {
    fn state(&self) -> AgentState {
        AgentState::Validating
    }

    async fn handle(
        &self,
        services: &AgentServices,
        ctx: &mut ExecutionContext,
        _input: &str,
    ) -> Result<Advance> {
        let index = ctx.step_index();
        let total = ctx
            .plan
            .as_ref()
            .map(|plan| plan.len())
            .ok_or(OrchestratorError::MissingPlan)?;
        let criteria = ctx
            .current_step()
            .map(|step| step.success_criteria.clone())
            .ok_or(OrchestratorError::MissingStep { index })?;
        let verdict = ctx
            .last_result()
            .map(|result| validate_step_result(&criteria, result))
            .ok_or(OrchestratorError::MissingStepResult)?;

        if verdict.is_valid() {
            if let Some(result) = ctx.last_result_mut() {
                result.mark_verified();
            }
            info!(session_id = %ctx.session_id, step = index, "Step validated");

            if index + 1 < total {
                ctx.current_step_index = Some(index + 1);
                return Ok(Advance::new(
                    AgentState::Executing,
                    format!("Validation passed, moving to step {}", index + 2),
                ));
            }
            return Ok(Advance::new(
                AgentState::Completed,
                "All steps validated and completed",
            ));
        }

        let auto_retry = services.config.enable_auto_retry;
        let step = ctx
            .current_step_mut()
            .ok_or(OrchestratorError::MissingStep { index })?;
        step.retry_count += 1;

        warn!(
            step = index,
            retry_count = step.retry_count,
            max_retries = step.max_retries,
            criteria = %criteria,
            "Step result did not meet success criteria"
        );

        if step.has_retries_left() && auto_retry {
            step.status = StepStatus::Pending;
            Ok(Advance::new(
                AgentState::Retrying,
                "Validation failed, retrying step",
            ))
        } else {
            step.status = StepStatus::Failed;
            Ok(Advance::new(
                AgentState::Failed,
                "Validation failed: success criteria not met",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::OrchestratorConfig;
    use agent_core::{StepResult, TaskPlan, TaskStep};
    use std::sync::Arc;

    fn validating_context(steps: Vec<TaskStep>, result: StepResult) -> ExecutionContext {
        let mut ctx = ExecutionContext::new("ses_1", 3);
        ctx.plan = Some(TaskPlan::new("goal", steps));
        ctx.current_step_index = Some(0);
        ctx.step_results.push(result);
        ctx.state = AgentState::Validating;
        ctx
    }

    #[tokio::test]
    async fn test_valid_last_step_completes() {
        let step = TaskStep::new("a", "Task completed successfully", 3);
        let result = StepResult::succeeded(step.id, None);
        let mut ctx = validating_context(vec![step], result);

        let advance = ValidatingHandler
            .handle(&services(), &mut ctx, "")
            .await
            .unwrap();

        assert_eq!(
            advance,
            Advance::new(AgentState::Completed, "All steps validated and completed")
        );
        let result = ctx.last_result().unwrap();
        assert!(result.verified);
        assert!(result.verified_at.is_some());
    }

    #[tokio::test]
    async fn test_valid_moves_cursor_forward() {
        let first = TaskStep::new("a", "Task completed successfully", 3);
        let second = TaskStep::new("b", "Task completed successfully", 3);
        let result = StepResult::succeeded(first.id, None);
        let mut ctx = validating_context(vec![first, second], result);

        let advance = ValidatingHandler
            .handle(&services(), &mut ctx, "")
            .await
            .unwrap();

        assert_eq!(advance.to, AgentState::Executing);
        assert_eq!(ctx.current_step_index, Some(1));
    }

    #[tokio::test]
    async fn test_invalid_with_budget_retries() {
        let mut step = TaskStep::new("a", "Produce output", 3);
        step.status = StepStatus::Completed;
        let result = StepResult::succeeded(step.id, None);
        let mut ctx = validating_context(vec![step], result);

        let advance = ValidatingHandler
            .handle(&services(), &mut ctx, "")
            .await
            .unwrap();

        assert_eq!(advance.to, AgentState::Retrying);
        let step = ctx.current_step().unwrap();
        assert_eq!(step.retry_count, 1);
        assert_eq!(step.status, StepStatus::Pending);
        assert!(!ctx.last_result().unwrap().verified);
    }

    #[tokio::test]
    async fn test_invalid_without_budget_fails() {
        let step = TaskStep::new("a", "Produce output", 1);
        let result = StepResult::succeeded(step.id, None);
        let mut ctx = validating_context(vec![step], result);

        let advance = ValidatingHandler
            .handle(&services(), &mut ctx, "")
            .await
            .unwrap();

        assert_eq!(advance.to, AgentState::Failed);
        assert_eq!(ctx.current_step().unwrap().status, StepStatus::Failed);
    }

    #[tokio::test]
    async fn test_invalid_with_auto_retry_disabled_fails() {
        let step = TaskStep::new("a", "Produce output", 3);
        let result = StepResult::succeeded(step.id, None);
        let mut ctx = validating_context(vec![step], result);
        let services = services_with(
            Arc::new(RecordingBackend::default()),
            OrchestratorConfig::default().with_auto_retry(false),
        );

        let advance = ValidatingHandler.handle(&services, &mut ctx, "").await.unwrap();
        assert_eq!(advance.to, AgentState::Failed);
    }

    #[tokio::test]
    async fn test_missing_pieces_are_errors() {
        let mut ctx = ExecutionContext::new("ses_1", 3);
        let err = ValidatingHandler
            .handle(&services(), &mut ctx, "")
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::MissingPlan));

        ctx.plan = Some(TaskPlan::new("goal", vec![TaskStep::new("a", "b", 1)]));
        let err = ValidatingHandler
            .handle(&services(), &mut ctx, "")
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::MissingStepResult));

        ctx.current_step_index = Some(4);
        let err = ValidatingHandler
            .handle(&services(), &mut ctx, "")
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::MissingStep { index: 4 }));
    }
}
