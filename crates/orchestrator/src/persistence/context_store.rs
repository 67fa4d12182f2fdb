//! Context Store
//!
//! Persists full execution contexts as JSON files under the project:
//! ```text
//! .opencode-studio/
//! └── agent/
//!     └── contexts/
//!         └── <session_id>.json
//! ```

use agent_core::ExecutionContext;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{OrchestratorError, Result};

const STUDIO_DIR: &str = ".opencode-studio";
const AGENT_DIR: &str = "agent";
const CONTEXTS_DIR: &str = "contexts";

#[derive(Debug, Clone)]
pub struct ContextFileStore {
    project_path: PathBuf,
}

impl ContextFileStore {
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    pub fn contexts_dir(&self) -> PathBuf {
        self.project_path
            .join(STUDIO_DIR)
            .join(AGENT_DIR)
            .join(CONTEXTS_DIR)
    }

    pub fn context_path(&self, session_id: &str) -> PathBuf {
        self.contexts_dir()
            .join(format!("{}.json", Self::file_stem(session_id)))
    }

    /// Session ids come from the backend. Every byte outside `[A-Za-z0-9_-]`
    /// is percent-encoded; the mapping is one-to-one and never yields a path
    /// separator.
    fn file_stem(session_id: &str) -> String {
        let mut stem = String::with_capacity(session_id.len());
        for byte in session_id.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => stem.push(byte as char),
                _ => stem.push_str(&format!("%{:02X}", byte)),
            }
        }
        stem
    }

    pub async fn save(&self, ctx: &ExecutionContext) -> Result<()> {
        let dir = self.contexts_dir();
        fs::create_dir_all(&dir).await.map_err(|e| {
            OrchestratorError::persistence(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let path = self.context_path(&ctx.session_id);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(ctx)?;

        fs::write(&tmp, content).await.map_err(|e| {
            OrchestratorError::persistence(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).await.map_err(|e| {
            OrchestratorError::persistence(format!("Failed to replace {}: {}", path.display(), e))
        })?;

        debug!(
            session_id = %ctx.session_id,
            state = %ctx.state,
            path = %path.display(),
            "Context saved"
        );
        Ok(())
    }

    pub async fn load(&self, session_id: &str) -> Result<Option<ExecutionContext>> {
        let path = self.context_path(session_id);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(session_id = %session_id, "No stored context");
                return Ok(None);
            }
            Err(e) => {
                return Err(OrchestratorError::persistence(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        match serde_json::from_str::<ExecutionContext>(&content) {
            Ok(ctx) if ctx.session_id == session_id => Ok(Some(ctx)),
            Ok(ctx) => {
                warn!(
                    session_id = %session_id,
                    stored_session_id = %ctx.session_id,
                    path = %path.display(),
                    "Ignoring stored context of another session"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    path = %path.display(),
                    error = %e,
                    "Ignoring malformed stored context"
                );
                Ok(None)
            }
        }
    }
}
