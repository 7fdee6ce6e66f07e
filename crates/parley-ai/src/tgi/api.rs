//! GenerationClient implementation for TgiClient (streamed and one-shot).

use async_trait::async_trait;
use futures_util::TryStreamExt;
use parley_common::{GenerationError, GenerationParameters};
use tokio_util::io::StreamReader;
use tracing::debug;

use super::client::TgiClient;
use crate::streaming::delta_stream;
use crate::{DeltaStream, GenerationClient, Message};

fn map_reqwest(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Network(e.to_string())
    }
}

/// Turn a non-success status into an error, keeping the first 200
/// characters of the body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GenerationError::RateLimited);
    }
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let text = text.chars().take(200).collect::<String>();
        return Err(GenerationError::Api(format!("HTTP {status}: {text}")));
    }
    Ok(response)
}

#[async_trait]
impl GenerationClient for TgiClient {
    async fn stream_chat(
        &self,
        messages: &[Message],
        params: &GenerationParameters,
    ) -> Result<DeltaStream, GenerationError> {
        let body = self.build_request_body(messages, params, true);

        debug!(url = %self.chat_url, messages = messages.len(), "streaming chat request");

        let response = self.request(&body).send().await.map_err(map_reqwest)?;
        let response = check_status(response).await?;

        let bytes = response.bytes_stream().map_err(std::io::Error::other);
        Ok(delta_stream(StreamReader::new(Box::pin(bytes))))
    }

    async fn complete(
        &self,
        messages: &[Message],
        params: &GenerationParameters,
    ) -> Result<String, GenerationError> {
        let body = self.build_request_body(messages, params, false);

        debug!(url = %self.chat_url, "chat request");

        let response = self
            .request(&body)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(map_reqwest)?;
        let response = check_status(response).await?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| GenerationError::Parse("response has no message content".into()))
    }
}
