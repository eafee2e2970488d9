//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::retry::RetryPolicy;

/// The `engine` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempts per work item, and per provider call.
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Work items processed concurrently.
    pub workers: usize,
    /// Provider calls outstanding at once.
    pub max_concurrent_requests: usize,
    /// Visits allowed to the development cycle.
    pub max_cycles: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            workers: 2,
            max_concurrent_requests: 4,
            max_cycles: 5,
        }
    }
}

impl EngineConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: u32) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.max_attempts == 0 {
            return Err(CoreError::Config("max_attempts must be at least 1".to_string()));
        }
        if self.workers == 0 {
            return Err(CoreError::Config("workers must be at least 1".to_string()));
        }
        if self.max_concurrent_requests == 0 {
            return Err(CoreError::Config(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.max_cycles == 0 {
            return Err(CoreError::Config("max_cycles must be at least 1".to_string()));
        }
        if self.base_backoff_ms > self.max_backoff_ms {
            return Err(CoreError::Config(
                "base_backoff_ms must not exceed max_backoff_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Backoff policy for provider calls, with full jitter.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_backoff(
                Duration::from_millis(self.base_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.max_backoff, Duration::from_secs(30));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = EngineConfig::default().with_workers(0);
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"workers": 4}"#).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.max_cycles, 5);
    }
}
