//! Validation for the endpoint registry and the autosave/retry tunables.

use std::ops::RangeInclusive;

use crate::schema::ChatConfig;

use super::helpers::validate_range;

pub(crate) const SAVE_INTERVAL_RANGE: RangeInclusive<u64> = 1..=3600;
pub(crate) const RETRY_COOLDOWN_RANGE: RangeInclusive<u64> = 1..=600;
pub(crate) const MAX_ATTEMPTS_RANGE: RangeInclusive<u32> = 1..=10;
pub(crate) const BACKOFF_RANGE: RangeInclusive<u64> = 0..=60;
pub(crate) const IDLE_TIMEOUT_RANGE: RangeInclusive<u64> = 5..=600;

/// Validate endpoint names and addresses are non-empty.
pub(crate) fn validate_endpoints(errors: &mut Vec<String>, config: &ChatConfig) {
    if config.current_endpoint.trim().is_empty() {
        errors.push("current_endpoint must not be empty".to_string());
    }
    for (name, address) in &config.endpoints {
        if name.trim().is_empty() {
            errors.push("endpoint names must not be empty".to_string());
        }
        if address.trim().is_empty() {
            errors.push(format!("endpoints.{name} has an empty address"));
        }
    }
}

/// Validate autosave constraints.
pub(crate) fn validate_autosave(errors: &mut Vec<String>, config: &ChatConfig) {
    validate_range(
        errors,
        "autosave.save_interval_secs",
        config.autosave.save_interval_secs,
        SAVE_INTERVAL_RANGE,
    );
    validate_range(
        errors,
        "autosave.retry_cooldown_secs",
        config.autosave.retry_cooldown_secs,
        RETRY_COOLDOWN_RANGE,
    );
}

/// Validate retry constraints.
pub(crate) fn validate_retry(errors: &mut Vec<String>, config: &ChatConfig) {
    validate_range(
        errors,
        "retry.max_attempts",
        config.retry.max_attempts,
        MAX_ATTEMPTS_RANGE,
    );
    validate_range(
        errors,
        "retry.backoff_secs",
        config.retry.backoff_secs,
        BACKOFF_RANGE,
    );
    validate_range(
        errors,
        "retry.idle_timeout_secs",
        config.retry.idle_timeout_secs,
        IDLE_TIMEOUT_RANGE,
    );
}
