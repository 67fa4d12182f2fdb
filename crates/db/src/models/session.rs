use agent_core::{AgentState, SessionDescriptor};
use chrono::{DateTime, TimeZone, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub id: String,
    pub title: String,
    pub state: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SessionRow {
    pub fn into_domain(self) -> SessionDescriptor {
        SessionDescriptor {
            id: self.id,
            title: self.title,
            state: AgentState::parse(&self.state).unwrap_or_default(),
            created_at: millis_to_datetime(self.created_at),
            updated_at: millis_to_datetime(self.updated_at),
        }
    }
}

impl From<&SessionDescriptor> for SessionRow {
    fn from(session: &SessionDescriptor) -> Self {
        Self {
            id: session.id.clone(),
            title: session.title.clone(),
            state: session.state.as_str().to_string(),
            created_at: session.created_at.timestamp_millis(),
            updated_at: session.updated_at.timestamp_millis(),
        }
    }
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}
