use std::sync::Arc;

use async_trait::async_trait;
use parley_ai::prompt::{title_messages, title_parameters};
use parley_ai::GenerationClient;
use parley_common::{GenerationError, Turn};
use parley_history::TitleGenerator;

/// Titles sessions by asking the generation service itself.
pub struct ClientTitleGenerator {
    client: Arc<dyn GenerationClient>,
}

impl ClientTitleGenerator {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TitleGenerator for ClientTitleGenerator {
    async fn generate_title(&self, turns: &[Turn]) -> Result<String, GenerationError> {
        self.client
            .complete(&title_messages(turns), &title_parameters())
            .await
    }
}
