//! Agent execution orchestrator.
//!
//! Turns one user turn into a supervised plan: each session's
//! [`ExecutionContext`](agent_core::ExecutionContext) is driven through
//! Planning, Executing, Validating and Retrying until it reaches Completed,
//! Cancelled or Failed. The context is persisted after every transition so a
//! crashed turn can resume where it stopped.

pub mod cancellation;
pub mod config;
pub mod error;
pub mod handlers;
pub mod orchestrator;
pub mod persistence;
pub mod prompts;
pub mod services;
pub mod state_machine;
pub mod validation;

pub use cancellation::CancellationRegistry;
pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, Result};
pub use orchestrator::{AgentOrchestrator, AgentOrchestratorBuilder};
pub use persistence::{
    ContextFileStore, MemoryPersistence, SessionPersistence, StudioPersistence,
};
pub use services::{
    Backend, ContextRetriever, NoopRetriever, OpenCodeBackend, Planner, RetrievalOptions,
    RetrievedContext, RetrievedContexts, SingleStepPlanner,
};
pub use state_machine::AgentStateMachine;
pub use validation::{validate_step_result, Validation};
