//! Configuration schema types for Parley.
//!
//! All structs use `serde(default)` so configs written by older versions,
//! or by hand with only a few keys, still load. Unknown top-level keys are
//! kept in `extra` and written back untouched.

mod autosave;
mod retry;

pub use autosave::*;
pub use retry::*;

use std::collections::BTreeMap;

use parley_common::GenerationParameters;
use serde::{Deserialize, Serialize};

/// Address used when no config exists yet (a local TGI server).
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080";

/// System instruction prepended to every request by default.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant.";

/// Root configuration for Parley.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Address every new client is built against. Need not appear in
    /// `endpoints`.
    pub current_endpoint: String,
    pub system_message: String,
    /// Display name to service address.
    pub endpoints: BTreeMap<String, String>,
    pub parameters: GenerationParameters,
    pub autosave: AutosaveSettings,
    pub retry: RetrySettings,
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for ChatConfig {
    fn default() -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert("Local TGI".to_string(), DEFAULT_ENDPOINT.to_string());
        Self {
            current_endpoint: DEFAULT_ENDPOINT.to_string(),
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            endpoints,
            parameters: GenerationParameters::default(),
            autosave: AutosaveSettings::default(),
            retry: RetrySettings::default(),
            extra: toml::Table::new(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
