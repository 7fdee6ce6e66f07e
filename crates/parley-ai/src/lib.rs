//! Generation client layer for Parley.
//!
//! Provides:
//! - The [`GenerationClient`] capability: messages in, text deltas out
//! - A client for OpenAI-compatible chat endpoints such as TGI
//! - SSE parsing of streamed completions
//! - [`StreamingTurn`], which drives one reply with retries and cancellation

pub mod prompt;
pub mod shared;
pub mod streaming;
pub mod tgi;
pub mod turn;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, TryStreamExt};
use parley_common::{GenerationError, GenerationParameters};

pub use prompt::{build_messages, validate_message, MAX_MESSAGE_CHARS};
pub use shared::SharedClient;
pub use tgi::{TgiClient, TgiConfig};
pub use turn::{RetryPolicy, StreamingTurn, TurnEvent, TurnStatus};

/// Lazily produced text fragments of one reply.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Start a streamed completion. Connection and HTTP status errors are
    /// returned here; errors while reading arrive through the stream.
    async fn stream_chat(
        &self,
        messages: &[Message],
        params: &GenerationParameters,
    ) -> Result<DeltaStream, GenerationError>;

    /// Full reply as one string.
    async fn complete(
        &self,
        messages: &[Message],
        params: &GenerationParameters,
    ) -> Result<String, GenerationError> {
        let stream = self.stream_chat(messages, params).await?;
        stream
            .try_fold(String::new(), |mut text, delta| async move {
                text.push_str(&delta);
                Ok(text)
            })
            .await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}
