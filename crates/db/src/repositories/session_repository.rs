use crate::error::DbError;
use crate::models::SessionRow;
use agent_core::SessionDescriptor;
use sqlx::SqlitePool;
use tracing::debug;

#[derive(Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert the descriptor or refresh its state. The title of an existing
    /// session is kept.
    pub async fn upsert(&self, session: &SessionDescriptor) -> Result<(), DbError> {
        let row = SessionRow::from(session);

        sqlx::query(
            r#"
            INSERT INTO agent_sessions (id, title, state, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at
            "#,
        )
        .bind(&row.id)
        .bind(&row.title)
        .bind(&row.state)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(session_id = %row.id, state = %row.state, "Session descriptor saved");
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<SessionDescriptor>, DbError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, title, state, created_at, updated_at
            FROM agent_sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_domain()))
    }
}
