use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry policy for a single generation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub backoff_secs: u64,
    /// Longest silence allowed while waiting for the next delta.
    pub idle_timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: 1,
            idle_timeout_secs: 60,
        }
    }
}

impl RetrySettings {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
