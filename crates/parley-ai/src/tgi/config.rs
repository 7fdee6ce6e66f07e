//! TGI client configuration.

use std::fmt;
use std::time::Duration;

/// Connection settings for one text-generation endpoint.
#[derive(Clone)]
pub struct TgiConfig {
    pub base_url: String,
    /// Sent as `model`; TGI serves a single model and accepts any name.
    pub model: String,
    /// Optional bearer token for endpoints behind auth.
    pub api_token: Option<String>,
    pub connect_timeout: Duration,
    /// Whole-request limit for non-streamed calls.
    pub request_timeout: Duration,
}

impl fmt::Debug for TgiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TgiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl TgiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: "tgi".to_string(),
            api_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Like [`TgiConfig::new`], picking up a token from `HF_TOKEN` if set.
    pub fn from_env(base_url: impl Into<String>) -> Self {
        let config = Self::new(base_url);
        match std::env::var("HF_TOKEN") {
            Ok(token) if !token.trim().is_empty() => config.with_api_token(token.trim()),
            _ => config,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }
}
