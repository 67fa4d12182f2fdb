//! Storage mirror of the in-memory contexts, used only for crash recovery.

mod context_store;
mod memory;
mod studio;

use agent_core::{ExecutionContext, SessionDescriptor};
use async_trait::async_trait;

use crate::error::Result;

pub use context_store::ContextFileStore;
pub use memory::MemoryPersistence;
pub use studio::StudioPersistence;

/// Where session records and full execution contexts are kept.
///
/// `load_*` returns `Ok(None)` when nothing usable is stored, including
/// unreadable data, so callers can start fresh.
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    async fn save_session(&self, session: &SessionDescriptor) -> Result<()>;

    async fn load_session(&self, session_id: &str) -> Result<Option<SessionDescriptor>>;

    async fn save_context(&self, ctx: &ExecutionContext) -> Result<()>;

    async fn load_context(&self, session_id: &str) -> Result<Option<ExecutionContext>>;
}
