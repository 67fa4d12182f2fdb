use agent_core::{ExecutionContext, SessionDescriptor};
use async_trait::async_trait;
use db::SessionRepository;
use std::path::Path;
use tracing::info;

use super::{ContextFileStore, SessionPersistence};
use crate::error::Result;

/// Session records in SQLite, full contexts as JSON files in the project.
#[derive(Clone)]
pub struct StudioPersistence {
    sessions: SessionRepository,
    contexts: ContextFileStore,
}

impl StudioPersistence {
    pub fn new(sessions: SessionRepository, contexts: ContextFileStore) -> Self {
        Self { sessions, contexts }
    }

    /// Open the database at `database_path` (migrating it) and keep contexts
    /// under `project_path`.
    pub async fn open(project_path: &Path, database_path: &Path) -> Result<Self> {
        let pool = db::create_pool_at(database_path)
            .await
            .map_err(db::DbError::from)?;
        db::run_migrations(&pool).await?;

        info!(
            database = %database_path.display(),
            project = %project_path.display(),
            "Session storage ready"
        );

        Ok(Self::new(
            SessionRepository::new(pool),
            ContextFileStore::new(project_path),
        ))
    }
}

#[async_trait]
impl SessionPersistence for StudioPersistence {
    async fn save_session(&self, session: &SessionDescriptor) -> Result<()> {
        self.sessions.upsert(session).await?;
        Ok(())
    }

    async fn load_session(&self, session_id: &str) -> Result<Option<SessionDescriptor>> {
        Ok(self.sessions.find_by_id(session_id).await?)
    }

    async fn save_context(&self, ctx: &ExecutionContext) -> Result<()> {
        self.contexts.save(ctx).await
    }

    async fn load_context(&self, session_id: &str) -> Result<Option<ExecutionContext>> {
        self.contexts.load(session_id).await
    }
}
