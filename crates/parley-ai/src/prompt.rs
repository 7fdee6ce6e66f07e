//! Request context assembly.

use parley_common::{GenerationParameters, Turn, ValidationError};

use crate::Message;

/// Longest user message accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const TITLE_PROMPT: &str = "Based on this conversation, generate a very brief (3-5 words) \
                            title that captures the main topic:";

/// Reject empty, whitespace-only, or oversized user input.
pub fn validate_message(message: &str) -> Result<(), ValidationError> {
    if message.trim().is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    let len = message.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(ValidationError::MessageTooLong {
            len,
            max: MAX_MESSAGE_CHARS,
        });
    }
    Ok(())
}

/// System instruction, then every prior exchange in order, then `message`.
/// Turns whose assistant slot is absent contribute only the user side.
pub fn build_messages(system: &str, prior: &[Turn], message: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(prior.len() * 2 + 2);
    messages.push(Message::system(system));
    for turn in prior {
        messages.push(Message::user(&turn.user));
        if let Some(assistant) = &turn.assistant {
            messages.push(Message::assistant(assistant));
        }
    }
    messages.push(Message::user(message));
    messages
}

/// Single-message request asking for a short title of `turns`.
pub fn title_messages(turns: &[Turn]) -> Vec<Message> {
    let mut conversation = String::new();
    for turn in turns {
        conversation.push_str("User: ");
        conversation.push_str(&turn.user);
        conversation.push('\n');
        if let Some(assistant) = &turn.assistant {
            conversation.push_str("Assistant: ");
            conversation.push_str(assistant);
            conversation.push('\n');
        }
    }
    vec![Message::user(format!(
        "{TITLE_PROMPT}\n\n{}",
        conversation.trim_end()
    ))]
}

/// Sampling settings for title requests; titles are a handful of tokens.
pub fn title_parameters() -> GenerationParameters {
    GenerationParameters {
        temperature: 0.7,
        max_tokens: 16,
        ..GenerationParameters::default()
    }
}
