//! One assistant reply, streamed with retries and cancellation.
//!
//! [`StreamingTurn`] is pull-based: the caller awaits [`next_event`] until it
//! returns `None`. A failed attempt is retried from scratch after a fixed
//! backoff and announced with [`TurnEvent::Restart`], so the caller can drop
//! whatever partial text the failed attempt produced. Cancellation is checked
//! before every delta and while waiting on the network or a backoff; a
//! cancelled turn keeps the text already delivered and is never retried. An
//! attempt that stays silent for longer than the idle timeout counts as
//! failed with a timeout.
//!
//! [`next_event`]: StreamingTurn::next_event


use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parley_common::{GenerationError, GenerationParameters, Turn, ValidationError};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::prompt::{build_messages, validate_message};
use crate::{DeltaStream, GenerationClient, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub backoff: Duration,
    /// An attempt that goes this long without connecting or producing a
    /// delta fails with [`GenerationError::Timeout`].
    pub idle_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Next fragment of the reply.
    Delta(String),
    /// The previous attempt failed; everything delivered so far is void and
    /// attempt number `attempt` starts from empty.
    Restart { attempt: u32, reason: String },
    /// All attempts failed. The string replaces the reply text.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

pub struct StreamingTurn {
    client: Arc<dyn GenerationClient>,
    messages: Vec<Message>,
    params: GenerationParameters,
    policy: RetryPolicy,
    cancel: CancellationToken,
    attempt: u32,
    stream: Option<DeltaStream>,
    text: String,
    status: TurnStatus,
}

impl StreamingTurn {
    /// Validate `message` and prepare a turn over `prior` context. Nothing
    /// is sent until the first [`next_event`](Self::next_event).
    pub fn start(
        client: Arc<dyn GenerationClient>,
        system: &str,
        prior: &[Turn],
        message: &str,
        params: GenerationParameters,
        policy: RetryPolicy,
        cancel: CancellationToken,
    ) -> Result<Self, ValidationError> {
        validate_message(message)?;
        let messages = build_messages(system, prior, message);
        Ok(Self::new(client, messages, params, policy, cancel))
    }

    /// Prepare a turn over a pre-built message list.
    pub fn new(
        client: Arc<dyn GenerationClient>,
        messages: Vec<Message>,
        params: GenerationParameters,
        policy: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            messages,
            params,
            policy,
            cancel,
            attempt: 0,
            stream: None,
            text: String::new(),
            status: TurnStatus::Running,
        }
    }

    pub fn status(&self) -> TurnStatus {
        self.status
    }

    /// Attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Reply text of the current attempt, or the failure text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    fn max_attempts(&self) -> u32 {
        self.policy.max_attempts.max(1)
    }

    /// Next event, or `None` once the turn completed, was cancelled, or
    /// has already reported failure.
    pub async fn next_event(&mut self) -> Option<TurnEvent> {
        loop {
            if self.status != TurnStatus::Running {
                return None;
            }
            if self.cancel.is_cancelled() {
                return self.cancelled();
            }

            if self.stream.is_none() {
                self.attempt += 1;
                debug!(attempt = self.attempt, "starting generation attempt");
                let cancel = self.cancel.clone();
                let connect = self.client.stream_chat(&self.messages, &self.params);
                let connected = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    result = timeout(self.policy.idle_timeout, connect) => {
                        Some(result.unwrap_or(Err(GenerationError::Timeout)))
                    }
                };
                match connected {
                    None => return self.cancelled(),
                    Some(Ok(stream)) => self.stream = Some(stream),
                    Some(Err(e)) => return self.attempt_failed(e).await,
                }
            }
            let Some(stream) = self.stream.as_mut() else {
                continue;
            };

            let cancel = self.cancel.clone();
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = timeout(self.policy.idle_timeout, stream.next()) => {
                    Some(item.unwrap_or(Some(Err(GenerationError::Timeout))))
                }
            };
            match next {
                None => return self.cancelled(),
                Some(Some(Ok(delta))) => {
                    if delta.is_empty() {
                        continue;
                    }
                    self.text.push_str(&delta);
                    return Some(TurnEvent::Delta(delta));
                }
                Some(Some(Err(e))) => {
                    self.stream = None;
                    return self.attempt_failed(e).await;
                }
                Some(None) => {
                    self.stream = None;
                    self.status = TurnStatus::Completed;
                    info!(attempts = self.attempt, chars = self.text.len(), "reply complete");
                    return None;
                }
            }
        }
    }

    fn cancelled(&mut self) -> Option<TurnEvent> {
        self.stream = None;
        self.status = TurnStatus::Cancelled;
        info!(attempt = self.attempt, chars = self.text.len(), "reply cancelled");
        None
    }

    async fn attempt_failed(&mut self, error: GenerationError) -> Option<TurnEvent> {
        let max = self.max_attempts();
        warn!(attempt = self.attempt, max, "generation attempt failed: {error}");

        if self.attempt >= max {
            self.status = TurnStatus::Failed;
            self.text =
                format!("Error: Failed to generate response after {max} attempts. {error}");
            return Some(TurnEvent::Failed(self.text.clone()));
        }

        let cancel = self.cancel.clone();
        let waited = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.policy.backoff) => true,
        };
        if !waited {
            return self.cancelled();
        }

        self.text.clear();
        Some(TurnEvent::Restart {
            attempt: self.attempt + 1,
            reason: error.to_string(),
        })
    }
}
