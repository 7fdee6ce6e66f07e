use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 0.0..=2.0;
pub const TOP_P_RANGE: RangeInclusive<f64> = 0.0..=1.0;
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 64..=4096;

/// Sampling parameters forwarded with every generation request.
///
/// Every field has a default so configs written before a parameter existed
/// still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParameters {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            max_tokens: 1024,
        }
    }
}
