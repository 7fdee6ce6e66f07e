//! Title generation for newly persisted sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_common::id::clean_generated_title;
use parley_common::{fallback_title, GenerationError, Turn};
use tracing::{debug, warn};

/// Number of leading turns shown to the title generator.
pub const TITLE_CONTEXT_TURNS: usize = 3;

/// Produces a short human title from the start of a conversation.
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    async fn generate_title(&self, turns: &[Turn]) -> Result<String, GenerationError>;
}

/// Ask `generator` for a title, falling back to a timestamped one on error
/// or empty output. Never fails.
pub async fn resolve_title(
    generator: Option<&dyn TitleGenerator>,
    turns: &[Turn],
    now: DateTime<Utc>,
) -> String {
    let Some(generator) = generator else {
        return fallback_title(now);
    };
    let context = &turns[..turns.len().min(TITLE_CONTEXT_TURNS)];
    match generator.generate_title(context).await {
        Ok(raw) => {
            let title = clean_generated_title(&raw);
            if title.is_empty() {
                debug!("title generator returned nothing, using fallback");
                fallback_title(now)
            } else {
                title
            }
        }
        Err(e) => {
            warn!("title generation failed, using fallback: {e}");
            fallback_title(now)
        }
    }
}
