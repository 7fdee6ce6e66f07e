use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How often an in-flight conversation is written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveSettings {
    /// Minimum seconds between non-forced saves of one session.
    pub save_interval_secs: u64,
    /// Seconds to wait before retrying a save that failed.
    pub retry_cooldown_secs: u64,
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            save_interval_secs: 30,
            retry_cooldown_secs: 5,
        }
    }
}

impl AutosaveSettings {
    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    pub fn retry_cooldown(&self) -> Duration {
        Duration::from_secs(self.retry_cooldown_secs)
    }
}
