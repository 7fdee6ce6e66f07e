//! Core TOML config loading: read from path, or seed defaults.

use crate::schema::ChatConfig;
use crate::validation;
use parley_common::ConfigError;
use std::path::Path;
use tracing::{info, warn};

use super::paths::create_default_config;

/// Load config from a specific TOML file path.
///
/// Deserializes the file using serde defaults for any missing fields.
/// Out-of-range values are replaced by their defaults and logged; they
/// never reach a request.
pub fn load_from_path(path: &Path) -> Result<ChatConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };

    let mut config: ChatConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    for warning in validation::sanitize(&mut config) {
        warn!("config validation warning: {warning} -- using default");
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from `path`, seeding a commented default file if none exists.
pub fn load_or_create(path: &Path) -> Result<ChatConfig, ConfigError> {
    match load_from_path(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!("no config found at {}, creating default", path.display());
            create_default_config(path)?;
            Ok(ChatConfig::default())
        }
        Err(e) => Err(e),
    }
}
