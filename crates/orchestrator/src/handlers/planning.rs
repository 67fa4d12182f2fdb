//! Planning: augment the request with retrieved context, ask the backend for
//! a plan and build the plan the session will execute.

use agent_core::{AgentState, ExecutionContext};
use async_trait::async_trait;
use events::Event;
use tracing::{debug, info};

use super::{Advance, AgentServices, StateHandler};
use crate::config::{PLANNING_MAX_RESULTS, PLANNING_MAX_TOKENS};
use crate::error::{OrchestratorError, Result};
use crate::prompts::AgentPrompts;
use crate::services::RetrievalOptions;

pub struct PlanningHandler;

#[async_trait]
impl StateHandler for PlanningHandler {
    fn state(&self) -> AgentState {
        AgentState::Planning
    }

    async fn handle(
        &self,
        services: &AgentServices,
        ctx: &mut ExecutionContext,
        input: &str,
    ) -> Result<Advance> {
        let options = RetrievalOptions::new(PLANNING_MAX_RESULTS, PLANNING_MAX_TOKENS)
            .with_current_note(services.current_note_path());
        let augmented = services.retrieve(input, &options).await.augment(input);

        debug!(
            session_id = %ctx.session_id,
            input_length = input.len(),
            augmented_length = augmented.len(),
            "Requesting plan from backend"
        );

        services
            .backend
            .send_message(&ctx.session_id, &AgentPrompts::planning(&augmented))
            .await
            .map_err(|e| OrchestratorError::Planning(e.to_string()))?;

        let plan = services
            .planner
            .build_plan(&augmented, services.config.max_retries);

        info!(
            session_id = %ctx.session_id,
            plan_id = %plan.id,
            steps = plan.len(),
            "Plan created"
        );
        services.emit(Event::PlanCreated {
            session_id: ctx.session_id.clone(),
            plan_id: plan.id,
            steps: plan.len(),
        });

        let steps = plan.len();
        ctx.plan = Some(plan);
        ctx.current_step_index = Some(0);

        Ok(Advance::new(
            AgentState::Executing,
            format!("Plan created with {} step(s)", steps),
        ))
    }
}
