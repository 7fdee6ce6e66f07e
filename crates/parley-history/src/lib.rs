//! Conversation history for Parley.
//!
//! [`HistoryStore`] keeps one JSON document per session in a directory and
//! replaces it atomically on every save. Live sessions talk to it through the
//! [`RecordStore`] trait so they can be tested against fakes.

pub mod record;
pub mod store;
pub mod title;

pub use record::{SessionRecord, SessionSummary};
pub use store::{HistoryStore, RecordStore, DEFAULT_MIN_SAVE_INTERVAL};
pub use title::{resolve_title, TitleGenerator, TITLE_CONTEXT_TURNS};
