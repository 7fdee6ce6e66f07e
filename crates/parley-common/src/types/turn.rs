use serde::{Deserialize, Serialize};

/// One user message paired with its (possibly absent) assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TurnRepr")]
pub struct Turn {
    pub user: String,
    #[serde(default)]
    pub assistant: Option<String>,
}

impl Turn {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: None,
        }
    }

    pub fn answered(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: Some(assistant.into()),
        }
    }

    /// Append a streamed fragment to the assistant slot.
    pub fn push_delta(&mut self, delta: &str) {
        self.assistant
            .get_or_insert_with(String::new)
            .push_str(delta);
    }

    /// Assistant text, or `""` while nothing has arrived yet.
    pub fn assistant_text(&self) -> &str {
        self.assistant.as_deref().unwrap_or("")
    }
}

/// Accepts both the current `{user, assistant}` shape and the legacy
/// `[user, assistant|null]` pair.
#[derive(Deserialize)]
#[serde(untagged)]
enum TurnRepr {
    Object {
        user: String,
        #[serde(default)]
        assistant: Option<String>,
    },
    Pair(String, Option<String>),
}

impl From<TurnRepr> for Turn {
    fn from(repr: TurnRepr) -> Self {
        match repr {
            TurnRepr::Object { user, assistant } | TurnRepr::Pair(user, assistant) => {
                Self { user, assistant }
            }
        }
    }
}
