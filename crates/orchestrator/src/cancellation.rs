//! Set of sessions the user asked to stop.
//!
//! Cancellation is cooperative: the orchestrator samples the registry once per
//! loop iteration, so an in-flight backend or retrieval call always finishes.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct CancellationRegistry {
    cancelled: RwLock<HashSet<String>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the session was not already marked.
    pub fn cancel(&self, session_id: &str) -> bool {
        self.cancelled
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.to_string())
    }

    pub fn is_cancelled(&self, session_id: &str) -> bool {
        self.cancelled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(session_id)
    }

    /// Returns `true` if the session was marked.
    pub fn clear(&self, session_id: &str) -> bool {
        self.cancelled
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
    }
}
