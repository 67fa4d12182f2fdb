use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::error::{OpenCodeError, Result};
use crate::types::{ModelRef, SendMessageRequest};

pub struct OpenCodeClient {
    base_url: String,
    client: Client,
    model: Option<ModelRef>,
}

impl OpenCodeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            model: None,
        }
    }

    pub fn with_model(mut self, model: ModelRef) -> Self {
        self.model = Some(model);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> Option<&ModelRef> {
        self.model.as_ref()
    }

    /// Post a text prompt into a session. The reply body is not inspected.
    pub async fn send_message(&self, session_id: &str, prompt: &str) -> Result<()> {
        let mut request = SendMessageRequest::new(prompt);
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }

        debug!(
            session_id = %session_id,
            prompt_length = prompt.len(),
            "Sending message to OpenCode"
        );

        let response = self
            .client
            .post(format!("{}/session/{}/message", self.base_url, session_id))
            .json(&request)
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    pub async fn abort_session(&self, session_id: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/session/{}/abort", self.base_url, session_id))
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(OpenCodeError::SessionNotFound(
                response.url().path().to_string(),
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OpenCodeError::InvalidResponse(format!(
                "Status {}: {}",
                status, body
            )));
        }

        Ok(response)
    }
}
