//! One handler per non-terminal state.
//!
//! A handler consumes the session's context, mutates it, and returns an
//! [`Advance`] naming the next state. It never records the transition itself;
//! the orchestrator validates the edge and appends it to the log.

mod executing;
mod planning;
mod retrying;
mod validating;

use agent_core::{AgentState, ExecutionContext};
use async_trait::async_trait;
use events::{Event, EventBus};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::persistence::SessionPersistence;
use crate::services::{Backend, ContextRetriever, Planner, RetrievalOptions, RetrievedContexts};

pub use executing::ExecutingHandler;
pub use planning::PlanningHandler;
pub use retrying::RetryingHandler;
pub use validating::ValidatingHandler;

/// A handler's decision: where to go next and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub to: AgentState,
    pub reason: String,
}

impl Advance {
    pub fn new(to: AgentState, reason: impl Into<String>) -> Self {
        Self {
            to,
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait StateHandler: Send + Sync {
    fn state(&self) -> AgentState;

    async fn handle(
        &self,
        services: &AgentServices,
        ctx: &mut ExecutionContext,
        input: &str,
    ) -> Result<Advance>;
}

/// Handler for `state`, or `None` for terminal states.
pub fn handler_for(state: AgentState) -> Option<&'static dyn StateHandler> {
    match state {
        AgentState::Planning => Some(&PlanningHandler),
        AgentState::Executing => Some(&ExecutingHandler),
        AgentState::Validating => Some(&ValidatingHandler),
        AgentState::Retrying => Some(&RetryingHandler),
        AgentState::Completed | AgentState::Cancelled | AgentState::Failed => None,
    }
}

/// Collaborators and settings shared by all handlers.
pub struct AgentServices {
    pub config: OrchestratorConfig,
    pub backend: Arc<dyn Backend>,
    pub retriever: Arc<dyn ContextRetriever>,
    pub planner: Arc<dyn Planner>,
    pub persistence: Arc<dyn SessionPersistence>,
    pub event_bus: Option<EventBus>,
    current_note_path: RwLock<Option<String>>,
}

impl AgentServices {
    pub fn new(
        config: OrchestratorConfig,
        backend: Arc<dyn Backend>,
        retriever: Arc<dyn ContextRetriever>,
        planner: Arc<dyn Planner>,
        persistence: Arc<dyn SessionPersistence>,
    ) -> Self {
        Self {
            config,
            backend,
            retriever,
            planner,
            persistence,
            event_bus: None,
            current_note_path: RwLock::new(None),
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn emit(&self, event: Event) {
        if let Some(ref bus) = self.event_bus {
            bus.emit(event);
        }
    }

    pub fn current_note_path(&self) -> Option<String> {
        self.current_note_path
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_current_note_path(&self, path: Option<String>) {
        *self
            .current_note_path
            .write()
            .unwrap_or_else(PoisonError::into_inner) = path;
    }

    /// Query the retriever; a failing retriever yields no context.
    pub async fn retrieve(&self, query: &str, options: &RetrievalOptions) -> RetrievedContexts {
        match self.retriever.retrieve_context(query, options).await {
            Ok(found) => {
                debug!(
                    contexts = found.contexts.len(),
                    max_results = options.max_results,
                    "Context retrieved"
                );
                found
            }
            Err(e) => {
                warn!(error = %e, "Context retrieval failed, continuing without it");
                RetrievedContexts::default()
            }
        }
    }
}
