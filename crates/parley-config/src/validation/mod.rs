//! Full configuration validation.
//!
//! Each section has its own validator; `validate` calls them all and
//! collects errors into a single `ConfigError`. `sanitize` is the lenient
//! variant used at load time: invalid sections are reset to their defaults
//! and the problems are returned as warnings.

mod helpers;
mod parameters;
mod sections;

#[cfg(test)]
mod tests;

pub use parameters::{apply_parameter, Parameter};

use parley_common::{ConfigError, GenerationParameters};

use crate::schema::{AutosaveSettings, ChatConfig, RetrySettings, DEFAULT_ENDPOINT};

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ChatConfig) -> Result<(), ConfigError> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn collect_errors(config: &ChatConfig) -> Vec<String> {
    let mut errors: Vec<String> = Vec::new();
    sections::validate_endpoints(&mut errors, config);
    parameters::validate_parameters(&mut errors, &config.parameters);
    sections::validate_autosave(&mut errors, config);
    sections::validate_retry(&mut errors, config);
    errors
}

/// Reset every invalid section of `config` to its default.
///
/// Returns the validation messages for the sections that were reset.
pub fn sanitize(config: &mut ChatConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let mut errors = Vec::new();
    parameters::validate_parameters(&mut errors, &config.parameters);
    if !errors.is_empty() {
        config.parameters = GenerationParameters::default();
        warnings.append(&mut errors);
    }

    sections::validate_autosave(&mut errors, config);
    if !errors.is_empty() {
        config.autosave = AutosaveSettings::default();
        warnings.append(&mut errors);
    }

    sections::validate_retry(&mut errors, config);
    if !errors.is_empty() {
        config.retry = RetrySettings::default();
        warnings.append(&mut errors);
    }

    if config.current_endpoint.trim().is_empty() {
        warnings.push("current_endpoint must not be empty".to_string());
        config.current_endpoint = DEFAULT_ENDPOINT.to_string();
    }
    config
        .endpoints
        .retain(|name, address| !name.trim().is_empty() && !address.trim().is_empty());

    warnings
}
