//! Executing: dispatch the step at the cursor to the backend.
//!
//! A step with a tool call is forwarded as a step-execution message. The
//! send succeeding is taken as the step succeeding; no tool result is awaited
//! or correlated.

use agent_core::{AgentState, ExecutionContext, StepResult, StepStatus, TaskPlan, TaskStep};
use async_trait::async_trait;
use events::Event;
use tracing::{debug, info, warn};

use super::{Advance, AgentServices, StateHandler};
use crate::config::{STEP_MAX_RESULTS, STEP_MAX_TOKENS};
use crate::error::{OrchestratorError, Result};
use crate::prompts::AgentPrompts;
use crate::services::RetrievalOptions;

pub struct ExecutingHandler;

impl ExecutingHandler {
    async fn dispatch(
        services: &AgentServices,
        session_id: &str,
        step: &TaskStep,
        index: usize,
        plan: &TaskPlan,
    ) -> Result<()> {
        if step.tool_call.is_none() {
            debug!(session_id = %session_id, step_id = %step.id, "Step has no tool call");
            return Ok(());
        }

        let options = RetrievalOptions::new(STEP_MAX_RESULTS, STEP_MAX_TOKENS)
            .with_current_note(services.current_note_path())
            .with_task_plan(Some(plan.clone()));
        let context = services.retrieve(&step.description, &options).await;

        let prompt = AgentPrompts::step_execution(step, index, plan.len(), &context);
        services
            .backend
            .send_message(session_id, &prompt)
            .await
            .map_err(|e| OrchestratorError::StepExecution(e.to_string()))
    }
}

#[async_trait]
impl StateHandler for ExecutingHandler {
    fn state(&self) -> AgentState {
        AgentState::Executing
    }

    async fn handle(
        &self,
        services: &AgentServices,
        ctx: &mut ExecutionContext,
        _input: &str,
    ) -> Result<Advance> {
        let plan = match ctx.plan.as_ref() {
            Some(plan) if !plan.is_empty() => plan.clone(),
            _ => return Ok(Advance::new(AgentState::Completed, "No steps to execute")),
        };

        let index = ctx.step_index();
        let step = match plan.step(index) {
            Some(step) if step.status != StepStatus::Completed => step.clone(),
            _ => return Ok(Advance::new(AgentState::Completed, "All steps completed")),
        };

        ctx.current_step_index = Some(index);
        if let Some(current) = ctx.current_step_mut() {
            current.status = StepStatus::InProgress;
        }
        services.emit(Event::StepStarted {
            session_id: ctx.session_id.clone(),
            step_id: step.id,
            index,
        });

        let outcome = Self::dispatch(services, &ctx.session_id, &step, index, &plan).await;

        match outcome {
            Ok(()) => {
                ctx.step_results
                    .push(StepResult::succeeded(step.id, step.tool_call.clone()));
                if let Some(current) = ctx.current_step_mut() {
                    current.status = StepStatus::Completed;
                }
                services.emit(Event::StepFinished {
                    session_id: ctx.session_id.clone(),
                    step_id: step.id,
                    success: true,
                });
                info!(session_id = %ctx.session_id, step = index, "Step executed");

                Ok(Advance::new(AgentState::Validating, "Step executed"))
            }
            Err(e) if e.is_retryable() => {
                ctx.step_results.push(StepResult::failed(step.id, e.to_string()));
                services.emit(Event::StepFinished {
                    session_id: ctx.session_id.clone(),
                    step_id: step.id,
                    success: false,
                });

                let auto_retry = services.config.enable_auto_retry;
                let current = ctx
                    .current_step_mut()
                    .ok_or(OrchestratorError::MissingStep { index })?;
                current.retry_count += 1;

                warn!(
                    step = index,
                    retry_count = current.retry_count,
                    max_retries = current.max_retries,
                    error = %e,
                    "Step execution failed"
                );

                if current.has_retries_left() && auto_retry {
                    Ok(Advance::new(
                        AgentState::Retrying,
                        format!(
                            "Step failed, retrying ({}/{}): {}",
                            current.retry_count, current.max_retries, e
                        ),
                    ))
                } else {
                    current.status = StepStatus::Failed;
                    Ok(Advance::new(
                        AgentState::Failed,
                        format!(
                            "Step failed after {} attempt(s): {}",
                            current.retry_count, e
                        ),
                    ))
                }
            }
            Err(e) => Err(e),
        }
    }
}
