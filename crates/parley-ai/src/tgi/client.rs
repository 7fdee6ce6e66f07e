//! TGI client struct, URL handling, and request building.

use parley_common::{GenerationError, GenerationParameters};

use super::config::TgiConfig;
use crate::Message;

const CHAT_PATH: &str = "chat/completions";

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct TgiClient {
    pub(crate) config: TgiConfig,
    pub(crate) http: reqwest::Client,
    pub(crate) chat_url: reqwest::Url,
}

impl std::fmt::Debug for TgiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TgiClient")
            .field("config", &self.config)
            .field("chat_url", &self.chat_url.as_str())
            .finish()
    }
}

impl TgiClient {
    /// Build a client for `base_url`. Fails on anything that is not an
    /// absolute http(s) URL; no request is made.
    pub fn new(base_url: &str) -> Result<Self, GenerationError> {
        Self::from_config(TgiConfig::from_env(base_url.trim()))
    }

    pub fn from_config(config: TgiConfig) -> Result<Self, GenerationError> {
        let chat_url = chat_url(&config.base_url)?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| GenerationError::InvalidEndpoint(e.to_string()))?;
        Ok(Self {
            config,
            http,
            chat_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub(crate) fn request(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let request = self.http.post(self.chat_url.clone()).json(body);
        match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Build the JSON request body.
    pub(crate) fn build_request_body(
        &self,
        messages: &[Message],
        params: &GenerationParameters,
        stream: bool,
    ) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": params.temperature,
            "top_p": params.top_p,
            "max_tokens": params.max_tokens,
            "stream": stream,
        })
    }
}

/// `{base}/v1/chat/completions`, or `{base}/chat/completions` when the base
/// already ends in `/v1`.
fn chat_url(base_url: &str) -> Result<reqwest::Url, GenerationError> {
    let base = reqwest::Url::parse(base_url.trim())
        .map_err(|e| GenerationError::InvalidEndpoint(format!("{base_url}: {e}")))?;
    if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
        return Err(GenerationError::InvalidEndpoint(format!(
            "{base_url}: expected an http(s) address"
        )));
    }

    let path = base.path().trim_end_matches('/').to_string();
    let full = if path.ends_with("/v1") {
        format!("{path}/{CHAT_PATH}")
    } else {
        format!("{path}/v1/{CHAT_PATH}")
    };
    let mut url = base;
    url.set_path(&full);
    Ok(url)
}
