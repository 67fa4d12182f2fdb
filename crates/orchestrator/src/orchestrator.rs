//! The per-session loop.
//!
//! [`AgentOrchestrator::run_turn`] drives one session's context through the
//! state handlers until it reaches a terminal state. Every transition is
//! validated against [`AgentStateMachine`], recorded on the context, mirrored
//! to persistence and published on the event bus.

use agent_core::{AgentState, ExecutionContext, SessionDescriptor};
use events::{Event, EventBus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, error, info, warn};

use crate::cancellation::CancellationRegistry;
use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};
use crate::handlers::{handler_for, Advance, AgentServices};
use crate::persistence::{MemoryPersistence, SessionPersistence};
use crate::services::{Backend, ContextRetriever, NoopRetriever, Planner, SingleStepPlanner};
use crate::state_machine::AgentStateMachine;

pub const CANCELLED_REASON: &str = "Cancelled by user";

type TurnLock = Arc<tokio::sync::Mutex<()>>;

pub struct AgentOrchestrator {
    services: AgentServices,
    contexts: RwLock<HashMap<String, ExecutionContext>>,
    cancellations: CancellationRegistry,
    turn_locks: Mutex<HashMap<String, TurnLock>>,
}

impl AgentOrchestrator {
    pub fn new(services: AgentServices) -> Self {
        Self {
            services,
            contexts: RwLock::new(HashMap::new()),
            cancellations: CancellationRegistry::new(),
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn builder(backend: Arc<dyn Backend>) -> AgentOrchestratorBuilder {
        AgentOrchestratorBuilder::new(backend)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.services.config
    }

    pub fn set_current_note_path(&self, path: Option<String>) {
        self.services.set_current_note_path(path);
    }

    pub fn is_cancelled(&self, session_id: &str) -> bool {
        self.cancellations.is_cancelled(session_id)
    }

    /// Run one turn for `session_id`.
    ///
    /// Never fails: handler errors become a Failed transition whose reason is
    /// the error message. Inspect [`Self::get_context`] afterward.
    pub async fn run_turn(&self, input: &str, session_id: &str) {
        let lock = self.turn_lock(session_id);
        let _guard = lock.lock().await;

        let mut ctx = self.load_or_create(session_id).await;
        info!(session_id = %session_id, state = %ctx.state, "Turn started");

        loop {
            if self.cancellations.is_cancelled(session_id) {
                if ctx.state != AgentState::Cancelled {
                    self.record(&mut ctx, AgentState::Cancelled, CANCELLED_REASON);
                    self.commit(&ctx, input).await;
                }
                break;
            }
            if ctx.is_terminal() {
                break;
            }

            match self.step(&mut ctx, input).await {
                Ok(advance) => self.record(&mut ctx, advance.to, advance.reason),
                Err(e) => {
                    error!(
                        session_id = %session_id,
                        state = %ctx.state,
                        error = %e,
                        "Turn failed"
                    );
                    self.services.emit(Event::Error {
                        session_id: Some(session_id.to_string()),
                        message: e.to_string(),
                    });
                    self.record(&mut ctx, AgentState::Failed, e.to_string());
                }
            }

            // A cancel that landed mid-step already rewrote the cached copy;
            // the next iteration records Cancelled on this one.
            if self.cancellations.is_cancelled(session_id) {
                continue;
            }
            self.commit(&ctx, input).await;
        }

        info!(session_id = %session_id, state = %ctx.state, "Turn finished");
        self.services.emit(Event::TurnFinished {
            session_id: session_id.to_string(),
            state: ctx.state,
        });
    }

    /// Mark the session cancelled. A cached context moves to Cancelled at
    /// once and the backend is asked to interrupt the remote session.
    /// Does not wait for a running turn.
    pub async fn cancel_session(&self, session_id: &str) {
        self.cancellations.cancel(session_id);

        let cancelled = {
            let mut contexts = self
                .contexts
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            match contexts.get_mut(session_id) {
                Some(ctx) if ctx.state != AgentState::Cancelled => {
                    self.record(ctx, AgentState::Cancelled, CANCELLED_REASON);
                    Some(ctx.clone())
                }
                Some(_) => {
                    debug!(session_id = %session_id, "Session already cancelled");
                    None
                }
                None => {
                    debug!(session_id = %session_id, "No context to cancel");
                    None
                }
            }
        };

        let Some(ctx) = cancelled else {
            return;
        };

        info!(session_id = %session_id, "Session cancelled");
        self.persist_context(&ctx).await;
        match self.services.persistence.load_session(session_id).await {
            Ok(Some(mut descriptor)) => {
                descriptor.state = ctx.state;
                descriptor.updated_at = ctx.updated_at;
                self.persist_descriptor(&descriptor).await;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Failed to load session record");
            }
        }
        self.services.emit(Event::SessionCancelled {
            session_id: session_id.to_string(),
        });

        if let Err(e) = self.services.backend.interrupt(session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to interrupt backend session");
        }
    }

    pub fn get_context(&self, session_id: &str) -> Option<ExecutionContext> {
        self.contexts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    pub fn list_contexts(&self) -> Vec<ExecutionContext> {
        self.contexts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Forget the session locally: drops the cached context and the
    /// cancellation flag. Persisted data is left alone.
    pub fn clear_context(&self, session_id: &str) {
        self.contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
        self.cancellations.clear(session_id);

        let mut locks = self
            .turn_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(session_id);
        }
        debug!(session_id = %session_id, "Context cleared");
    }

    /// Cached context, or the persisted one pulled into the cache.
    pub async fn hydrate(&self, session_id: &str) -> Option<ExecutionContext> {
        if let Some(ctx) = self.get_context(session_id) {
            return Some(ctx);
        }

        let ctx = match self.services.persistence.load_context(session_id).await {
            Ok(found) => found?,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Failed to load stored context");
                return None;
            }
        };
        if ctx.session_id != session_id {
            warn!(
                session_id = %session_id,
                stored_session_id = %ctx.session_id,
                "Stored context belongs to another session"
            );
            return None;
        }

        debug!(session_id = %session_id, state = %ctx.state, "Context restored");
        self.contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.to_string(), ctx.clone());
        Some(ctx)
    }

    fn turn_lock(&self, session_id: &str) -> TurnLock {
        self.turn_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    async fn load_or_create(&self, session_id: &str) -> ExecutionContext {
        match self.hydrate(session_id).await {
            Some(ctx) if !ctx.is_terminal() || self.cancellations.is_cancelled(session_id) => ctx,
            previous => {
                if let Some(previous) = previous {
                    debug!(
                        session_id = %session_id,
                        state = %previous.state,
                        "Previous turn finished, starting a new context"
                    );
                }

                let ctx = ExecutionContext::new(session_id, self.services.config.max_retries);
                self.contexts
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(session_id.to_string(), ctx.clone());
                self.services.emit(Event::ContextCreated {
                    session_id: session_id.to_string(),
                });
                ctx
            }
        }
    }

    async fn step(&self, ctx: &mut ExecutionContext, input: &str) -> Result<Advance> {
        let handler = handler_for(ctx.state).ok_or(OrchestratorError::TerminalState(ctx.state))?;
        let advance = handler.handle(&self.services, ctx, input).await?;
        AgentStateMachine::validate_transition(ctx.state, advance.to)?;
        Ok(advance)
    }

    fn record(&self, ctx: &mut ExecutionContext, to: AgentState, reason: impl Into<String>) {
        let from = ctx.state;
        let reason = reason.into();

        info!(
            session_id = %ctx.session_id,
            from = %from,
            to = %to,
            reason = %reason,
            "State transition"
        );
        ctx.record_transition(to, Some(reason.clone()));

        self.services.emit(Event::StateChanged {
            session_id: ctx.session_id.clone(),
            from,
            to,
            reason: Some(reason),
        });
    }

    async fn commit(&self, ctx: &ExecutionContext, input: &str) {
        self.contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ctx.session_id.clone(), ctx.clone());

        self.persist_context(ctx).await;
        self.persist_descriptor(&SessionDescriptor::from_context(ctx, input))
            .await;
    }

    async fn persist_context(&self, ctx: &ExecutionContext) {
        if let Err(e) = self.services.persistence.save_context(ctx).await {
            warn!(session_id = %ctx.session_id, error = %e, "Failed to persist context");
        }
    }

    async fn persist_descriptor(&self, descriptor: &SessionDescriptor) {
        if let Err(e) = self.services.persistence.save_session(descriptor).await {
            warn!(session_id = %descriptor.id, error = %e, "Failed to persist session record");
        }
    }
}

pub struct AgentOrchestratorBuilder {
    config: OrchestratorConfig,
    backend: Arc<dyn Backend>,
    retriever: Arc<dyn ContextRetriever>,
    planner: Arc<dyn Planner>,
    persistence: Arc<dyn SessionPersistence>,
    event_bus: Option<EventBus>,
}

impl AgentOrchestratorBuilder {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            config: OrchestratorConfig::default(),
            backend,
            retriever: Arc::new(NoopRetriever),
            planner: Arc::new(SingleStepPlanner),
            persistence: Arc::new(MemoryPersistence::new()),
            event_bus: None,
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn ContextRetriever>) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn SessionPersistence>) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn build(self) -> AgentOrchestrator {
        let mut services = AgentServices::new(
            self.config,
            self.backend,
            self.retriever,
            self.planner,
            self.persistence,
        );
        if let Some(bus) = self.event_bus {
            services = services.with_event_bus(bus);
        }
        AgentOrchestrator::new(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::RecordingBackend;

    fn orchestrator() -> AgentOrchestrator {
        AgentOrchestrator::builder(Arc::new(RecordingBackend::default())).build()
    }

    #[tokio::test]
    async fn test_turn_completes_and_is_cached() {
        let orchestrator = orchestrator();
        orchestrator.run_turn("list files", "ses_1").await;

        let ctx = orchestrator.get_context("ses_1").unwrap();
        assert_eq!(ctx.state, AgentState::Completed);
        assert!(AgentStateMachine::is_valid_path(&ctx.state_path()));
        assert_eq!(orchestrator.list_contexts().len(), 1);
    }

    #[tokio::test]
    async fn test_completed_session_starts_fresh_context() {
        let orchestrator = orchestrator();
        orchestrator.run_turn("first", "ses_1").await;
        let first = orchestrator.get_context("ses_1").unwrap();

        orchestrator.run_turn("second", "ses_1").await;
        let second = orchestrator.get_context("ses_1").unwrap();

        assert_eq!(second.state, AgentState::Completed);
        assert_ne!(first.plan.unwrap().id, second.plan.as_ref().unwrap().id);
        assert_eq!(second.plan.unwrap().goal, "second");
    }

    #[tokio::test]
    async fn test_cancelled_session_stays_cancelled() {
        let orchestrator = orchestrator();
        orchestrator.run_turn("first", "ses_1").await;
        orchestrator.cancel_session("ses_1").await;

        let ctx = orchestrator.get_context("ses_1").unwrap();
        assert_eq!(ctx.state, AgentState::Cancelled);
        assert_eq!(ctx.last_transition().unwrap().from, AgentState::Completed);
        assert_eq!(
            ctx.last_transition().unwrap().reason.as_deref(),
            Some(CANCELLED_REASON)
        );

        orchestrator.cancel_session("ses_1").await;
        orchestrator.run_turn("again", "ses_1").await;
        let after = orchestrator.get_context("ses_1").unwrap();
        assert_eq!(after.transitions.len(), ctx.transitions.len());
        assert_eq!(after.state, AgentState::Cancelled);
    }

    #[tokio::test]
    async fn test_clear_context_drops_flag() {
        let orchestrator = orchestrator();
        orchestrator.run_turn("first", "ses_1").await;
        orchestrator.cancel_session("ses_1").await;
        assert!(orchestrator.is_cancelled("ses_1"));

        orchestrator.clear_context("ses_1");
        assert!(orchestrator.get_context("ses_1").is_none());
        assert!(!orchestrator.is_cancelled("ses_1"));
    }

    #[tokio::test]
    async fn test_clear_context_releases_turn_lock() {
        let orchestrator = orchestrator();
        orchestrator.run_turn("first", "ses_1").await;
        orchestrator.run_turn("first", "ses_2").await;
        assert_eq!(orchestrator.turn_locks.lock().unwrap().len(), 2);

        orchestrator.clear_context("ses_1");
        let locks = orchestrator.turn_locks.lock().unwrap();
        assert!(!locks.contains_key("ses_1"));
        assert!(locks.contains_key("ses_2"));
    }

    #[tokio::test]
    async fn test_clear_context_keeps_lock_held_by_running_turn() {
        let orchestrator = orchestrator();
        let held = orchestrator.turn_lock("ses_1");

        orchestrator.clear_context("ses_1");
        assert!(orchestrator.turn_locks.lock().unwrap().contains_key("ses_1"));

        drop(held);
        orchestrator.clear_context("ses_1");
        assert!(orchestrator.turn_locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stored_context_of_other_session_is_not_adopted() {
        let persistence = Arc::new(MemoryPersistence::new());
        let mut other = ExecutionContext::new("chat.1", 3);
        other.record_transition(AgentState::Executing, Some("Plan created".into()));
        persistence.insert_raw_context("chat_1", serde_json::to_string(&other).unwrap());

        let backend = Arc::new(RecordingBackend::default());
        let orchestrator = AgentOrchestrator::builder(backend.clone())
            .with_persistence(persistence)
            .build();
        assert!(orchestrator.hydrate("chat_1").await.is_none());

        orchestrator.run_turn("hello", "chat_1").await;

        let ctx = orchestrator.get_context("chat_1").unwrap();
        assert_eq!(ctx.session_id, "chat_1");
        assert_eq!(ctx.state, AgentState::Completed);
        assert_eq!(orchestrator.list_contexts().len(), 1);
        assert!(backend
            .sent
            .lock()
            .unwrap()
            .iter()
            .all(|(session_id, _)| session_id == "chat_1"));
    }

    #[tokio::test]
    async fn test_hydrate_restores_persisted_context() {
        let persistence = Arc::new(MemoryPersistence::new());
        let first = AgentOrchestrator::builder(Arc::new(RecordingBackend::default()))
            .with_persistence(persistence.clone())
            .build();
        first.run_turn("list files", "ses_1").await;

        let second = AgentOrchestrator::builder(Arc::new(RecordingBackend::default()))
            .with_persistence(persistence)
            .build();
        assert!(second.get_context("ses_1").is_none());

        let restored = second.hydrate("ses_1").await.unwrap();
        assert_eq!(restored, first.get_context("ses_1").unwrap());
        assert!(second.get_context("ses_1").is_some());
    }

    #[tokio::test]
    async fn test_events_published() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let orchestrator = AgentOrchestrator::builder(Arc::new(RecordingBackend::default()))
            .with_event_bus(bus)
            .build();

        orchestrator.run_turn("list files", "ses_1").await;

        let mut seen = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            seen.push(envelope.event);
        }
        assert!(matches!(seen.first(), Some(Event::ContextCreated { .. })));
        assert!(seen
            .iter()
            .any(|event| matches!(event, Event::PlanCreated { steps: 1, .. })));
        assert!(matches!(
            seen.last(),
            Some(Event::TurnFinished {
                state: AgentState::Completed,
                ..
            })
        ));
    }
}
