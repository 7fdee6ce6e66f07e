//! The live state of one conversation.
//!
//! [`SessionState`] owns the current [`SessionRecord`] and is either idle or
//! generating a reply. While a reply streams it autosaves at most once per
//! save interval, and once the turn ends (completed, stopped, or failed) it
//! always attempts a forced save. A save that fails is not an error for the
//! caller: the session remembers it and retries after a cooldown, both at
//! every delta and whenever [`SessionState::check_pending_saves`] is called.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use parley_ai::{GenerationClient, StreamingTurn, TurnEvent, TurnStatus};
use parley_common::{GenerationParameters, ParleyError, PersistenceError, ValidationError};
use parley_history::{RecordStore, SessionRecord};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::control::TurnControl;
use crate::settings::SessionSettings;

/// Result of one submitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub status: TurnStatus,
    /// Final assistant text: the reply, the partial reply if stopped, or
    /// the failure notice.
    pub reply: String,
    /// Session id, if the session has been persisted.
    pub session_id: Option<String>,
}

impl TurnOutcome {
    pub fn stopped(&self) -> bool {
        self.status == TurnStatus::Cancelled
    }

    pub fn failed(&self) -> bool {
        self.status == TurnStatus::Failed
    }
}

pub struct SessionState {
    record: SessionRecord,
    store: Arc<dyn RecordStore>,
    control: TurnControl,
    settings: SessionSettings,
    last_save: Instant,
    pending_save: bool,
    last_save_attempt: Option<Instant>,
}

impl SessionState {
    /// Start with an empty, unsaved conversation.
    pub fn new(store: Arc<dyn RecordStore>, settings: SessionSettings) -> Self {
        Self {
            record: SessionRecord::new(),
            store,
            control: TurnControl::new(),
            settings,
            last_save: Instant::now(),
            pending_save: false,
            last_save_attempt: None,
        }
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn id(&self) -> Option<&str> {
        self.record.id.as_deref()
    }

    /// Handle for stopping the running turn from elsewhere.
    pub fn control(&self) -> TurnControl {
        self.control.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.control.is_generating()
    }

    pub fn has_pending_save(&self) -> bool {
        self.pending_save
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Replace the settings used by later turns.
    pub fn set_settings(&mut self, settings: SessionSettings) {
        self.settings = settings;
    }

    /// Send `message` and stream the reply into the record.
    ///
    /// `on_event` sees every event after it has been applied to the record.
    /// Only validation problems are errors; generation failures end up as
    /// reply text and persistence failures become a pending save.
    pub async fn submit<F>(
        &mut self,
        client: Arc<dyn GenerationClient>,
        params: GenerationParameters,
        message: &str,
        mut on_event: F,
    ) -> Result<TurnOutcome, ValidationError>
    where
        F: FnMut(&TurnEvent),
    {
        let guard = self.control.begin()?;
        let mut turn = StreamingTurn::start(
            client,
            &self.settings.system_message,
            &self.record.turns,
            message,
            params,
            self.settings.retry,
            guard.token(),
        )?;

        self.record.push_turn(message);
        self.last_save = Instant::now();
        debug!(session = ?self.record.id, turns = self.record.turns.len(), "turn started");

        while let Some(event) = turn.next_event().await {
            if let Some(slot) = self.record.last_turn_mut() {
                match &event {
                    TurnEvent::Delta(delta) => slot.push_delta(delta),
                    TurnEvent::Restart { .. } => slot.assistant = None,
                    TurnEvent::Failed(text) => slot.assistant = Some(text.clone()),
                }
            }
            on_event(&event);

            if matches!(event, TurnEvent::Delta(_)) {
                self.autosave().await;
                self.check_pending_saves().await;
            }
        }

        drop(guard);
        self.persist(true).await;

        Ok(TurnOutcome {
            status: turn.status(),
            reply: turn.into_text(),
            session_id: self.record.id.clone(),
        })
    }

    async fn autosave(&mut self) {
        if self.last_save.elapsed() < self.settings.save_interval {
            return;
        }
        self.persist(false).await;
        self.last_save = Instant::now();
    }

    /// Retry a failed save once the cooldown has passed. Returns whether a
    /// save is still pending afterwards.
    pub async fn check_pending_saves(&mut self) -> bool {
        if !self.pending_save {
            return false;
        }
        let cooled_down = self
            .last_save_attempt
            .map_or(true, |at| at.elapsed() >= self.settings.retry_cooldown);
        if cooled_down {
            debug!("retrying pending save");
            self.persist(true).await;
        }
        self.pending_save
    }

    /// Force a save of the current record if it has any turns.
    pub async fn flush(&mut self) -> bool {
        self.persist(true).await
    }

    /// Returns whether the record is safely on disk (or had nothing to save).
    async fn persist(&mut self, force: bool) -> bool {
        if self.record.is_empty() {
            self.pending_save = false;
            return true;
        }
        self.last_save_attempt = Some(Instant::now());
        match self.store.save(&mut self.record, force).await {
            Ok(id) => {
                if force && self.pending_save {
                    info!(%id, "pending save recovered");
                }
                if force {
                    self.pending_save = false;
                }
                true
            }
            Err(e) => {
                warn!(session = ?self.record.id, force, "save failed, will retry: {e}");
                self.pending_save = true;
                false
            }
        }
    }

    /// Switch to a stored session. Returns `false` if it does not exist.
    pub async fn resume(&mut self, id: &str) -> Result<bool, ParleyError> {
        if self.is_generating() {
            return Err(ValidationError::TurnInProgress.into());
        }
        let Some(record) = self.store.load(id).await? else {
            return Ok(false);
        };
        self.leave_current().await;
        info!(%id, turns = record.turns.len(), "session resumed");
        self.record = record;
        Ok(true)
    }

    /// Start over with an empty, unsaved conversation.
    pub async fn new_conversation(&mut self) -> Result<(), ValidationError> {
        if self.is_generating() {
            return Err(ValidationError::TurnInProgress);
        }
        self.leave_current().await;
        self.record = SessionRecord::new();
        Ok(())
    }

    /// Last chance to persist the outgoing record before it is replaced.
    async fn leave_current(&mut self) {
        if self.pending_save && !self.persist(true).await {
            warn!(session = ?self.record.id, "discarding session with unsaved changes");
        }
        self.pending_save = false;
        self.last_save_attempt = None;
    }

    /// Retitle the session. An unsaved session keeps the title for its
    /// first save, which also skips title generation.
    pub async fn rename(&mut self, title: &str) -> Result<(), PersistenceError> {
        let title = title.trim();
        let Some(id) = self.record.id.clone() else {
            self.record.title = (!title.is_empty()).then(|| title.to_string());
            return Ok(());
        };
        match self.store.rename(&id, title).await? {
            Some(stored) => self.record.title = stored.title,
            // Gone from disk; the next save recreates it with this title.
            None => self.record.title = (!title.is_empty()).then(|| title.to_string()),
        }
        Ok(())
    }

    /// Delete the stored session and start a new one.
    pub async fn delete(&mut self) -> Result<bool, ParleyError> {
        if self.is_generating() {
            return Err(ValidationError::TurnInProgress.into());
        }
        let removed = match self.record.id.as_deref() {
            Some(id) => self.store.delete(id).await?,
            None => false,
        };
        self.record = SessionRecord::new();
        self.pending_save = false;
        self.last_save_attempt = None;
        Ok(removed)
    }
}
