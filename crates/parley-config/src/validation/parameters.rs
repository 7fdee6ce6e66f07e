//! Generation parameter validation and single-parameter updates.

use std::fmt;
use std::str::FromStr;

use parley_common::types::{MAX_TOKENS_RANGE, TEMPERATURE_RANGE, TOP_P_RANGE};
use parley_common::{ConfigError, GenerationParameters};

use super::helpers::validate_range;

/// A single tunable generation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Temperature,
    TopP,
    MaxTokens,
}

impl Parameter {
    pub fn key(self) -> &'static str {
        match self {
            Parameter::Temperature => "temperature",
            Parameter::TopP => "top_p",
            Parameter::MaxTokens => "max_tokens",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Parameter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "temperature" => Ok(Parameter::Temperature),
            "top_p" => Ok(Parameter::TopP),
            "max_tokens" | "max_new_tokens" => Ok(Parameter::MaxTokens),
            other => Err(ConfigError::ValidationError(format!(
                "unknown parameter '{other}' (expected temperature, top_p or max_tokens)"
            ))),
        }
    }
}

/// Validate a full parameter set.
pub(crate) fn validate_parameters(errors: &mut Vec<String>, params: &GenerationParameters) {
    validate_range(
        errors,
        "parameters.temperature",
        params.temperature,
        TEMPERATURE_RANGE,
    );
    validate_range(errors, "parameters.top_p", params.top_p, TOP_P_RANGE);
    validate_range(
        errors,
        "parameters.max_tokens",
        params.max_tokens,
        MAX_TOKENS_RANGE,
    );
}

/// Return a copy of `current` with `param` set to `value`, or an error if
/// the value is out of range. `current` is never modified.
pub fn apply_parameter(
    current: &GenerationParameters,
    param: Parameter,
    value: f64,
) -> Result<GenerationParameters, ConfigError> {
    let mut next = current.clone();
    match param {
        Parameter::Temperature => next.temperature = value,
        Parameter::TopP => next.top_p = value,
        Parameter::MaxTokens => {
            if !value.is_finite() || value.fract() != 0.0 || value < 0.0 || value > f64::from(u32::MAX) {
                return Err(ConfigError::ValidationError(format!(
                    "parameters.max_tokens = {value} is not a whole number of tokens"
                )));
            }
            next.max_tokens = value as u32;
        }
    }

    let mut errors = Vec::new();
    validate_parameters(&mut errors, &next);
    if errors.is_empty() {
        Ok(next)
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
