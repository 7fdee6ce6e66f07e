//! Write ChatConfig to TOML on disk.
//!
//! Writes are atomic (write to `.tmp`, then rename) so a crash mid-write
//! leaves the previous file intact.

use std::io::Write;
use std::path::Path;

use parley_common::ConfigError;

use crate::schema::ChatConfig;

// =============================================================================
// PUBLIC API
// =============================================================================

/// Write config to a specific path.
///
/// Creates parent directories if they don't exist.
pub fn save_config_to_path(config: &ChatConfig, path: &Path) -> Result<(), ConfigError> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ConfigError::WriteError(format!("failed to serialize config to TOML: {e}")))?;
    write_atomic(path, &toml_str)?;
    tracing::debug!(path = %path.display(), "Config saved to disk");
    Ok(())
}

/// Replace `path` with `contents` via a temporary sibling file and a rename.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::WriteError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    let written = std::fs::File::create(&tmp_path).and_then(|mut file| {
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(ConfigError::WriteError(format!(
            "failed to write config to {}: {e}",
            tmp_path.display()
        )));
    }

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(ConfigError::WriteError(format!(
            "failed to replace {}: {e}",
            path.display()
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
