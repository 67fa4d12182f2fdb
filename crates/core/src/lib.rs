//! Shared data model for the agent execution orchestrator.
//!
//! Everything in this crate is plain data: plans, steps, results, the
//! transition log and the per-session execution context. Status and retry
//! fields are only ever mutated by the orchestrator.

pub mod domain;
mod error;

pub use domain::*;
pub use error::{CoreError, Result};
