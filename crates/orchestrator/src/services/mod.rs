//! Collaborators the orchestrator talks to: the LLM/tool backend, the
//! context retriever and the planner.

mod backend;
mod planner;
mod retrieval;

pub use backend::{Backend, OpenCodeBackend};
pub use planner::{Planner, SingleStepPlanner, DEFAULT_SUCCESS_CRITERIA};
pub use retrieval::{
    ContextRetriever, NoopRetriever, RetrievalOptions, RetrievedContext, RetrievedContexts,
};
