//! A client handle whose target can be swapped at runtime.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use parley_common::{GenerationError, GenerationParameters};

use crate::{DeltaStream, GenerationClient, Message};

/// Cloneable [`GenerationClient`] that forwards to a replaceable inner
/// client. Requests already started keep the client they began with.
#[derive(Clone)]
pub struct SharedClient {
    inner: Arc<RwLock<Arc<dyn GenerationClient>>>,
}

impl SharedClient {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(client)),
        }
    }

    pub fn replace(&self, client: Arc<dyn GenerationClient>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = client;
    }

    pub fn current(&self) -> Arc<dyn GenerationClient> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl GenerationClient for SharedClient {
    async fn stream_chat(
        &self,
        messages: &[Message],
        params: &GenerationParameters,
    ) -> Result<DeltaStream, GenerationError> {
        let client = self.current();
        client.stream_chat(messages, params).await
    }

    async fn complete(
        &self,
        messages: &[Message],
        params: &GenerationParameters,
    ) -> Result<String, GenerationError> {
        let client = self.current();
        client.complete(messages, params).await
    }
}
