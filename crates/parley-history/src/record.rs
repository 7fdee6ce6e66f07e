//! In-memory and on-disk shapes of a conversation.

use chrono::{DateTime, NaiveDateTime, Utc};
use parley_common::id::TIMESTAMP_FORMAT;
use parley_common::Turn;
use serde::{Deserialize, Serialize};

/// One conversation.
///
/// `id`, `created_at` and `last_modified_at` are `None` until the record is
/// first persisted. After that `id` never changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub turns: Vec<Turn>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new record with a caller-chosen title; skips title generation.
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push_turn(&mut self, user: impl Into<String>) -> &mut Turn {
        self.turns.push(Turn::new(user));
        let last = self.turns.len() - 1;
        &mut self.turns[last]
    }

    pub fn last_turn_mut(&mut self) -> Option<&mut Turn> {
        self.turns.last_mut()
    }

    /// Title to show: the stored title, else the id, else a placeholder.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("New chat")
    }
}

/// Listing entry for a stored session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub last_modified_at: DateTime<Utc>,
}

/// Document written to `<id>.json`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredSessionRef<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub turns: &'a [Turn],
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

/// Document read from disk. Every field is optional so older files and
/// hand-edited ones still load; legacy key names are accepted as aliases.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredSession {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "history")]
    turns: Option<Vec<Turn>>,
    #[serde(default, alias = "created_at", alias = "timestamp")]
    created_at: Option<String>,
    #[serde(default, alias = "last_modified", alias = "last_modified_at")]
    last_modified_at: Option<String>,
}

impl StoredSession {
    /// Back-fill missing fields. `id` is the file stem the document was read
    /// from, which is what later saves write back to. Returns `None` for a
    /// document that has no turns at all.
    pub(crate) fn into_record(self, id: &str, now: DateTime<Utc>) -> Option<SessionRecord> {
        let turns = self.turns?;
        let last_modified_at = self
            .last_modified_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(now);
        let created_at = self
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(last_modified_at);
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| id.to_string());

        Some(SessionRecord {
            id: Some(id.to_string()),
            title: Some(title),
            turns,
            created_at: Some(created_at),
            last_modified_at: Some(last_modified_at),
        })
    }
}

/// Parse RFC 3339, a naive ISO-8601 datetime (taken as UTC), or the compact
/// id timestamp.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", TIMESTAMP_FORMAT]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
