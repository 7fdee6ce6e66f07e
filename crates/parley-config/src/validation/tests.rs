//! Tests for the full validation pipeline.

use super::*;
use crate::schema::*;

#[test]
fn default_config_validates() {
    let config = ChatConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_temperature_too_large() {
    let mut config = ChatConfig::default();
    config.parameters.temperature = 5.0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("parameters.temperature"));
}

#[test]
fn catches_top_p_negative() {
    let mut config = ChatConfig::default();
    config.parameters.top_p = -0.1;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("parameters.top_p"));
}

#[test]
fn catches_max_tokens_too_small() {
    let mut config = ChatConfig::default();
    config.parameters.max_tokens = 10;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("parameters.max_tokens"));
}

#[test]
fn catches_zero_save_interval() {
    let mut config = ChatConfig::default();
    config.autosave.save_interval_secs = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("autosave.save_interval_secs"));
}

#[test]
fn catches_zero_attempts() {
    let mut config = ChatConfig::default();
    config.retry.max_attempts = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("retry.max_attempts"));
}

#[test]
fn catches_empty_endpoint_address() {
    let mut config = ChatConfig::default();
    config.endpoints.insert("broken".into(), "  ".into());
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("endpoints.broken"));
}

#[test]
fn rejects_zero_idle_timeout() {
    let mut config = ChatConfig::default();
    config.retry.idle_timeout_secs = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("retry.idle_timeout_secs"));
}

#[test]
fn collects_multiple_errors() {
    let mut config = ChatConfig::default();
    config.parameters.temperature = 3.0;
    config.retry.backoff_secs = 600;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("parameters.temperature"));
    assert!(err.contains("retry.backoff_secs"));
}

#[test]
fn sanitize_resets_only_invalid_sections() {
    let mut config = ChatConfig::default();
    config.parameters.temperature = 9.0;
    config.retry.max_attempts = 5;
    config.autosave.save_interval_secs = 0;

    let warnings = sanitize(&mut config);

    assert_eq!(warnings.len(), 2);
    assert_eq!(config.parameters, parley_common::GenerationParameters::default());
    assert_eq!(config.autosave, AutosaveSettings::default());
    assert_eq!(config.retry.max_attempts, 5);
    assert!(validate(&config).is_ok());
}

#[test]
fn sanitize_drops_blank_endpoints() {
    let mut config = ChatConfig::default();
    config.endpoints.insert("".into(), "http://x".into());
    config.current_endpoint = String::new();

    let warnings = sanitize(&mut config);

    assert_eq!(warnings.len(), 1);
    assert_eq!(config.current_endpoint, DEFAULT_ENDPOINT);
    assert!(!config.endpoints.contains_key(""));
}
