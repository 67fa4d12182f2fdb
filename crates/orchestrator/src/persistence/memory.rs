use agent_core::{ExecutionContext, SessionDescriptor};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::warn;

use super::SessionPersistence;
use crate::error::Result;

/// Process-local persistence. Contexts are kept serialized so loading yields
/// an independent copy, the same as a disk-backed store.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    sessions: RwLock<HashMap<String, SessionDescriptor>>,
    contexts: RwLock<HashMap<String, String>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw JSON for a session, bypassing serialization.
    pub fn insert_raw_context(&self, session_id: impl Into<String>, json: impl Into<String>) {
        self.contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.into(), json.into());
    }
}

#[async_trait]
impl SessionPersistence for MemoryPersistence {
    /// Insert the descriptor or refresh its state. The title of an existing
    /// session is kept.
    async fn save_session(&self, session: &SessionDescriptor) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        match sessions.get_mut(&session.id) {
            Some(existing) => {
                existing.state = session.state;
                existing.updated_at = session.updated_at;
            }
            None => {
                sessions.insert(session.id.clone(), session.clone());
            }
        }
        Ok(())
    }

    async fn load_session(&self, session_id: &str) -> Result<Option<SessionDescriptor>> {
        Ok(self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned())
    }

    async fn save_context(&self, ctx: &ExecutionContext) -> Result<()> {
        let json = serde_json::to_string(ctx)?;
        self.insert_raw_context(ctx.session_id.clone(), json);
        Ok(())
    }

    async fn load_context(&self, session_id: &str) -> Result<Option<ExecutionContext>> {
        let stored = self
            .contexts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned();

        let Some(json) = stored else {
            return Ok(None);
        };

        match serde_json::from_str(&json) {
            Ok(ctx) => Ok(Some(ctx)),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Ignoring malformed stored context");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::AgentState;

    #[tokio::test]
    async fn test_context_round_trip() {
        let store = MemoryPersistence::new();
        let mut ctx = ExecutionContext::new("ses_1", 3);
        ctx.record_transition(AgentState::Executing, None);

        store.save_context(&ctx).await.unwrap();
        assert_eq!(store.load_context("ses_1").await.unwrap(), Some(ctx));
        assert!(store.load_context("ses_2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_context_is_none() {
        let store = MemoryPersistence::new();
        store.insert_raw_context("ses_1", "[1, 2");
        assert!(store.load_context("ses_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_descriptor_round_trip() {
        let store = MemoryPersistence::new();
        let descriptor = SessionDescriptor::new("ses_1", "title");

        store.save_session(&descriptor).await.unwrap();
        assert_eq!(store.load_session("ses_1").await.unwrap(), Some(descriptor));
    }

    #[tokio::test]
    async fn test_save_session_keeps_first_title() {
        let store = MemoryPersistence::new();
        let mut descriptor = SessionDescriptor::new("ses_1", "first title");
        store.save_session(&descriptor).await.unwrap();

        descriptor.title = "second title".to_string();
        descriptor.state = AgentState::Completed;
        store.save_session(&descriptor).await.unwrap();

        let found = store.load_session("ses_1").await.unwrap().unwrap();
        assert_eq!(found.title, "first title");
        assert_eq!(found.state, AgentState::Completed);
    }
}
