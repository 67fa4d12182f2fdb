use agent_core::TaskPlan;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Bounds and hints for one retrieval query.
#[derive(Debug, Clone, Default)]
pub struct RetrievalOptions {
    pub max_results: usize,
    pub max_tokens: usize,
    /// Note the user currently has open, if any
    pub current_note_path: Option<String>,
    pub task_plan: Option<TaskPlan>,
}

impl RetrievalOptions {
    pub fn new(max_results: usize, max_tokens: usize) -> Self {
        Self {
            max_results,
            max_tokens,
            ..Default::default()
        }
    }

    pub fn with_current_note(mut self, path: Option<String>) -> Self {
        self.current_note_path = path;
        self
    }

    pub fn with_task_plan(mut self, plan: Option<TaskPlan>) -> Self {
        self.task_plan = plan;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub source: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedContexts {
    pub contexts: Vec<RetrievedContext>,
}

impl RetrievedContexts {
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn render(&self) -> String {
        self.contexts
            .iter()
            .map(|c| format!("### {}\n{}\n", c.source, c.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Append the retrieved notes to a user request. Without any context the
    /// request is returned unchanged.
    pub fn augment(&self, input: &str) -> String {
        if self.is_empty() {
            return input.to_string();
        }
        format!("{input}\n\n## Relevant Context\n{}", self.render())
    }
}

/// Source of notes relevant to a query (search index, embeddings, ...).
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve_context(
        &self,
        query: &str,
        options: &RetrievalOptions,
    ) -> Result<RetrievedContexts>;
}

/// Retriever that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRetriever;

#[async_trait]
impl ContextRetriever for NoopRetriever {
    async fn retrieve_context(
        &self,
        _query: &str,
        _options: &RetrievalOptions,
    ) -> Result<RetrievedContexts> {
        Ok(RetrievedContexts::default())
    }
}
