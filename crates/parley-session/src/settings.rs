use std::time::Duration;

use parley_ai::RetryPolicy;
use parley_config::schema::DEFAULT_SYSTEM_MESSAGE;
use parley_config::ChatConfig;

/// Per-session timing and prompt settings, usually taken from the config.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub system_message: String,
    /// Minimum time between autosaves while a reply streams.
    pub save_interval: Duration,
    /// Wait before retrying a failed save.
    pub retry_cooldown: Duration,
    pub retry: RetryPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            save_interval: Duration::from_secs(30),
            retry_cooldown: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            system_message: config.system_message.clone(),
            save_interval: config.autosave.save_interval(),
            retry_cooldown: config.autosave.retry_cooldown(),
            retry: RetryPolicy {
                max_attempts: config.retry.max_attempts,
                backoff: config.retry.backoff(),
                idle_timeout: config.retry.idle_timeout(),
            },
        }
    }
}
