use async_trait::async_trait;
use opencode::OpenCodeClient;
use tracing::{error, info};

use crate::error::{OrchestratorError, Result};

/// The component that talks to the language model and runs tools.
///
/// Replies are not consumed: the orchestrator treats a successful send as
/// the step having been dispatched.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn send_message(&self, session_id: &str, text: &str) -> Result<()>;

    /// Ask the backend to stop whatever it is doing for the session.
    async fn interrupt(&self, session_id: &str) -> Result<()>;
}

/// [`Backend`] backed by an OpenCode Server.
pub struct OpenCodeBackend {
    client: OpenCodeClient,
}

impl OpenCodeBackend {
    pub fn new(client: OpenCodeClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &OpenCodeClient {
        &self.client
    }
}

#[async_trait]
impl Backend for OpenCodeBackend {
    async fn send_message(&self, session_id: &str, text: &str) -> Result<()> {
        self.client
            .send_message(session_id, text)
            .await
            .map_err(|e| {
                error!(session_id = %session_id, error = %e, "Failed to send message to OpenCode");
                OrchestratorError::from(e)
            })
    }

    async fn interrupt(&self, session_id: &str) -> Result<()> {
        self.client.abort_session(session_id).await?;
        info!(session_id = %session_id, "OpenCode session aborted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_server_maps_to_backend_error() {
        let backend = OpenCodeBackend::new(OpenCodeClient::new("http://127.0.0.1:9"));
        assert_eq!(backend.client().base_url(), "http://127.0.0.1:9");

        let err = backend.send_message("ses_1", "hello").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Backend(_)));

        let err = backend.interrupt("ses_1").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Backend(_)));
    }
}
