use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Context retrieval bounds used while planning a turn.
pub const PLANNING_MAX_RESULTS: usize = 10;
pub const PLANNING_MAX_TOKENS: usize = 2000;
/// Context retrieval bounds used while executing a single step.
pub const STEP_MAX_RESULTS: usize = 5;
pub const STEP_MAX_TOKENS: usize = 1000;

/// Tunables for the orchestrator. Every field is optional in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Retry budget given to every planned step
    pub max_retries: u32,
    /// Fixed pause before a failed step is executed again
    pub retry_delay_ms: u64,
    /// Accepted for compatibility; no handler enforces it yet
    pub validation_timeout_ms: u64,
    pub enable_auto_retry: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            validation_timeout_ms: 5000,
            enable_auto_retry: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_auto_retry(mut self, enabled: bool) -> Self {
        self.enable_auto_retry = enabled;
        self
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
        assert_eq!(config.validation_timeout(), Duration::from_secs(5));
        assert!(config.enable_auto_retry);
    }

    #[test]
    fn test_builder() {
        let config = OrchestratorConfig::default()
            .with_max_retries(1)
            .with_retry_delay(Duration::from_millis(250))
            .with_auto_retry(false);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.retry_delay_ms, 250);
        assert!(!config.enable_auto_retry);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: OrchestratorConfig =
            serde_json::from_str(r#"{ "max_retries": 5 }"#).unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_delay_ms, 1000);
        assert!(config.enable_auto_retry);
    }
}
