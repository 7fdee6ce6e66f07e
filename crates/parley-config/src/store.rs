//! Process-wide configuration store.
//!
//! [`ConfigStore`] owns the loaded [`ChatConfig`] behind a lock so several
//! conversations can read it while one of them changes a setting. Every
//! mutation is staged on a copy, validated, written to disk, and only then
//! swapped in; any failure leaves both memory and disk at the previous
//! valid state.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use parley_common::{ConfigError, GenerationParameters};
use tracing::{info, warn};

use crate::schema::ChatConfig;
use crate::toml_loader;
use crate::toml_writer::save_config_to_path;
use crate::validation::{self, apply_parameter, Parameter};

pub struct ConfigStore {
    path: PathBuf,
    config: RwLock<ChatConfig>,
}

impl ConfigStore {
    /// Load the config at `path`, creating a default one if it is missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = toml_loader::load_or_create(&path)?;
        Ok(Self {
            path,
            config: RwLock::new(config),
        })
    }

    /// Load the config from the platform default location.
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::open(toml_loader::default_config_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the current config.
    pub fn snapshot(&self) -> ChatConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn parameters(&self) -> GenerationParameters {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .parameters
            .clone()
    }

    pub fn current_endpoint(&self) -> String {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current_endpoint
            .clone()
    }

    pub fn system_message(&self) -> String {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .system_message
            .clone()
    }

    /// Set one generation parameter after range-checking it.
    ///
    /// On rejection the stored parameters are unchanged.
    pub fn update_parameter(
        &self,
        param: Parameter,
        value: f64,
    ) -> Result<GenerationParameters, ConfigError> {
        let updated = self.commit(|config| {
            config.parameters = apply_parameter(&config.parameters, param, value)?;
            Ok(())
        });
        match updated {
            Ok(config) => {
                info!(%param, value, "generation parameter updated");
                Ok(config.parameters)
            }
            Err(e) => {
                warn!(%param, value, "rejected parameter update: {e}");
                Err(e)
            }
        }
    }

    /// Point the active endpoint at `address`.
    ///
    /// `connect` builds a client for the new address. The change is only
    /// committed (and the client returned) if that succeeds and the config
    /// is persisted; otherwise the previous address stays active and the
    /// caller keeps using its existing client.
    pub fn update_endpoint<C, E, F>(&self, address: &str, connect: F) -> Result<C, ConfigError>
    where
        F: FnOnce(&str) -> Result<C, E>,
        E: Display,
    {
        let address = address.trim();
        if address.is_empty() {
            return Err(ConfigError::ValidationError(
                "endpoint address must not be empty".into(),
            ));
        }

        let client = connect(address).map_err(|e| {
            warn!(address, "could not connect to endpoint, keeping previous: {e}");
            ConfigError::Endpoint(format!("{address}: {e}"))
        })?;

        self.commit(|config| {
            config.current_endpoint = address.to_string();
            Ok(())
        })?;
        info!(address, "active endpoint switched");
        Ok(client)
    }

    /// Map a registered endpoint name to its address; anything else is
    /// treated as a raw address.
    pub fn resolve_endpoint(&self, name_or_address: &str) -> String {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        config
            .endpoints
            .get(name_or_address)
            .cloned()
            .unwrap_or_else(|| name_or_address.trim().to_string())
    }

    /// Register (or overwrite) a named endpoint.
    pub fn add_endpoint(&self, name: &str, address: &str) -> Result<(), ConfigError> {
        let (name, address) = (name.trim(), address.trim());
        if name.is_empty() || address.is_empty() {
            return Err(ConfigError::ValidationError(
                "endpoint name and address must not be empty".into(),
            ));
        }
        self.commit(|config| {
            config
                .endpoints
                .insert(name.to_string(), address.to_string());
            Ok(())
        })?;
        info!(name, address, "endpoint registered");
        Ok(())
    }

    /// Remove a named endpoint. The current address is left alone even if
    /// it pointed at the removed entry.
    pub fn remove_endpoint(&self, name: &str) -> Result<Option<String>, ConfigError> {
        let mut removed = None;
        self.commit(|config| {
            removed = config.endpoints.remove(name);
            Ok(())
        })?;
        if removed.is_some() {
            info!(name, "endpoint removed");
        }
        Ok(removed)
    }

    /// Replace the system instruction used for new turns.
    pub fn set_system_message(&self, message: &str) -> Result<(), ConfigError> {
        self.commit(|config| {
            config.system_message = message.trim().to_string();
            Ok(())
        })?;
        info!("system message updated");
        Ok(())
    }

    /// Stage `change` on a copy, validate, persist, then swap it in.
    fn commit<F>(&self, change: F) -> Result<ChatConfig, ConfigError>
    where
        F: FnOnce(&mut ChatConfig) -> Result<(), ConfigError>,
    {
        let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let mut candidate = guard.clone();
        change(&mut candidate)?;
        validation::validate(&candidate)?;
        save_config_to_path(&candidate, &self.path)?;
        *guard = candidate.clone();
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::open(dir.path().join("config.toml")).unwrap()
    }

    #[test]
    fn open_seeds_defaults() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        assert!(store.path().exists());
        assert_eq!(store.snapshot(), ChatConfig::default());
    }

    #[test]
    fn update_parameter_persists() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);

        let params = store.update_parameter(Parameter::TopP, 0.5).unwrap();
        assert_eq!(params.top_p, 0.5);

        let reopened = open_in(&dir);
        assert_eq!(reopened.parameters().top_p, 0.5);
    }

    #[test]
    fn out_of_range_temperature_is_rejected_and_retained() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        store.update_parameter(Parameter::Temperature, 1.2).unwrap();

        let err = store
            .update_parameter(Parameter::Temperature, 5.0)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert_eq!(store.parameters().temperature, 1.2);

        let reopened = open_in(&dir);
        assert_eq!(reopened.parameters().temperature, 1.2);
    }

    #[test]
    fn update_endpoint_commits_on_success() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);

        let client: Result<String, ConfigError> =
            store.update_endpoint("http://10.1.1.1:8080", |addr| {
                Ok::<_, String>(format!("client for {addr}"))
            });
        assert_eq!(client.unwrap(), "client for http://10.1.1.1:8080");
        assert_eq!(store.current_endpoint(), "http://10.1.1.1:8080");
        assert_eq!(open_in(&dir).current_endpoint(), "http://10.1.1.1:8080");
    }

    #[test]
    fn update_endpoint_reverts_on_connect_failure() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        let before = store.current_endpoint();

        let result: Result<(), ConfigError> =
            store.update_endpoint("not a url", |_| Err("relative URL without a base"));
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Endpoint(_)));
        assert!(err.to_string().contains("relative URL"));
        assert_eq!(store.current_endpoint(), before);
        assert_eq!(open_in(&dir).current_endpoint(), before);
    }

    #[test]
    fn system_message_persists() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        store.set_system_message("  Answer tersely.\n").unwrap();
        assert_eq!(store.system_message(), "Answer tersely.");
        assert_eq!(open_in(&dir).system_message(), "Answer tersely.");
    }

    #[test]
    fn add_resolve_and_remove_endpoint() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);

        store.add_endpoint("GPU box", "http://10.0.0.7:8080").unwrap();
        assert_eq!(store.resolve_endpoint("GPU box"), "http://10.0.0.7:8080");
        assert_eq!(
            store.resolve_endpoint("http://raw:9000"),
            "http://raw:9000"
        );

        let removed = store.remove_endpoint("GPU box").unwrap();
        assert_eq!(removed.as_deref(), Some("http://10.0.0.7:8080"));
        assert_eq!(store.remove_endpoint("GPU box").unwrap(), None);
        assert!(!open_in(&dir).snapshot().endpoints.contains_key("GPU box"));
    }

    #[test]
    fn add_endpoint_rejects_blank() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);
        assert!(store.add_endpoint("", "http://x").is_err());
        assert!(store.add_endpoint("x", "   ").is_err());
    }

    #[test]
    fn unknown_fields_are_preserved_on_update() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
ui_theme = "soft"

[parameters]
temperature = 0.3
"#,
        )
        .unwrap();

        let store = ConfigStore::open(&path).unwrap();
        store.update_parameter(Parameter::MaxTokens, 512.0).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("ui_theme"));
        let reopened = ConfigStore::open(&path).unwrap();
        assert_eq!(reopened.parameters().temperature, 0.3);
        assert_eq!(reopened.parameters().max_tokens, 512);
    }
}
