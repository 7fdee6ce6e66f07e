//! Session id minting and title helpers.
//!
//! A session id is `{timestamp}_{sanitized title}`, minted once when a
//! conversation is first persisted. It doubles as the file stem on disk, so
//! anything that could escape the history directory is stripped.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

/// Timestamp layout used in ids and fallback titles.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Longest title fragment kept in an id.
pub const MAX_ID_TITLE_CHARS: usize = 48;

static UNSAFE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}_\-]+").expect("static regex is valid"));

/// Title used when no generated title is available.
pub fn fallback_title(now: DateTime<Utc>) -> String {
    format!("Chat_{}", now.format(TIMESTAMP_FORMAT))
}

/// Reduce a free-form title to a filename-safe fragment.
///
/// Runs of anything other than letters, digits, `-` and `_` collapse to a
/// single `_`. Never returns an empty string.
pub fn sanitize_title(title: &str) -> String {
    let replaced = UNSAFE_RE.replace_all(title.trim(), "_");
    let trimmed = replaced.trim_matches('_');
    let mut out: String = trimmed.chars().take(MAX_ID_TITLE_CHARS).collect();
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        "chat".to_string()
    } else {
        out
    }
}

/// Mint a new session id.
pub fn mint_session_id(now: DateTime<Utc>, title: &str) -> String {
    format!("{}_{}", now.format(TIMESTAMP_FORMAT), sanitize_title(title))
}

/// Whether `id` is safe to use as a file stem inside the history directory.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && !id.contains("..")
        && !id.contains(['/', '\\', '\0'])
}

/// Clean up a model-generated title: trim whitespace and surrounding quotes.
pub fn clean_generated_title(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}
