//! Retrying: wait a fixed delay, rewind the current step and hand it back
//! to Executing. The failed result is discarded so the retried attempt's
//! result is the one validated.

use agent_core::{AgentState, ExecutionContext, StepStatus};
use async_trait::async_trait;
use tracing::debug;

use super::{Advance, AgentServices, StateHandler};
use crate::error::Result;

pub struct RetryingHandler;

#[async_trait]
impl StateHandler for RetryingHandler {
    fn state(&self) -> AgentState {
        AgentState::Retrying
    }

    async fn handle(
        &self,
        services: &AgentServices,
        ctx: &mut ExecutionContext,
        _input: &str,
    ) -> Result<Advance> {
        let delay = services.config.retry_delay();
        debug!(session_id = %ctx.session_id, delay_ms = delay.as_millis() as u64, "Waiting before retry");
        tokio::time::sleep(delay).await;

        if let Some(step) = ctx.current_step_mut() {
            step.status = StepStatus::Pending;
        }
        ctx.step_results.pop();
        ctx.retry_count += 1;

        Ok(Advance::new(AgentState::Executing, "Retrying step"))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use agent_core::{StepResult, TaskPlan, TaskStep};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_rewinds_step_after_delay() {
        let mut step = TaskStep::new("a", "b", 3);
        step.status = StepStatus::InProgress;
        step.retry_count = 1;
        let step_id = step.id;

        let mut ctx = ExecutionContext::new("ses_1", 3);
        ctx.plan = Some(TaskPlan::new("goal", vec![step]));
        ctx.current_step_index = Some(0);
        ctx.step_results.push(StepResult::failed(step_id, "boom"));

        let started = tokio::time::Instant::now();
        let advance = RetryingHandler
            .handle(&services(), &mut ctx, "")
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(1000));
        assert_eq!(advance, Advance::new(AgentState::Executing, "Retrying step"));
        assert!(ctx.step_results.is_empty());
        assert_eq!(ctx.retry_count, 1);

        let step = ctx.current_step().unwrap();
        assert_eq!(step.status, StepStatus::Pending);
        assert_eq!(step.retry_count, 1);
    }
}
