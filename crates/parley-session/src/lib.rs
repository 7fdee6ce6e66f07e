//! Conversation sessions for Parley.
//!
//! Ties a [`RecordStore`](parley_history::RecordStore), a
//! [`GenerationClient`](parley_ai::GenerationClient) and the stop control
//! together into [`SessionState`], the object a front end drives one
//! message at a time.

pub mod control;
pub mod settings;
pub mod state;
pub mod title;

pub use control::TurnControl;
pub use settings::SessionSettings;
pub use state::{SessionState, TurnOutcome};
pub use title::ClientTitleGenerator;
