use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use parley_ai::{DeltaStream, Message, RetryPolicy};
use parley_common::{GenerationError, Turn};

use super::*;

// -- fake store -------------------------------------------------------------

#[derive(Default)]
struct FakeInner {
    /// (force, turns) for every save call, successful or not.
    calls: Vec<(bool, usize)>,
    fail_remaining: u32,
    records: HashMap<String, SessionRecord>,
}

#[derive(Default)]
struct FakeStore {
    inner: Mutex<FakeInner>,
}

impl FakeStore {
    fn failing(times: u32) -> Arc<Self> {
        let store = Self::default();
        store.inner.lock().unwrap().fail_remaining = times;
        Arc::new(store)
    }

    fn calls(&self) -> Vec<(bool, usize)> {
        self.inner.lock().unwrap().calls.clone()
    }

    fn forced(&self) -> usize {
        self.calls().iter().filter(|(force, _)| *force).count()
    }

    fn unforced(&self) -> usize {
        self.calls().iter().filter(|(force, _)| !*force).count()
    }

    fn stored(&self, id: &str) -> Option<SessionRecord> {
        self.inner.lock().unwrap().records.get(id).cloned()
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn save(
        &self,
        record: &mut SessionRecord,
        force: bool,
    ) -> Result<String, PersistenceError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push((force, record.turns.len()));
        if inner.fail_remaining > 0 {
            inner.fail_remaining -= 1;
            return Err(PersistenceError::io(
                "/history/x.json",
                std::io::Error::other("disk full"),
            ));
        }
        let id = record
            .id
            .get_or_insert_with(|| "20250101_000000_chat".to_string())
            .clone();
        inner.records.insert(id.clone(), record.clone());
        Ok(id)
    }

    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, PersistenceError> {
        Ok(self.stored(id))
    }

    async fn delete(&self, id: &str) -> Result<bool, PersistenceError> {
        Ok(self.inner.lock().unwrap().records.remove(id).is_some())
    }

    async fn rename(
        &self,
        id: &str,
        title: &str,
    ) -> Result<Option<SessionRecord>, PersistenceError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.records.get_mut(id).map(|record| {
            record.title = Some(title.to_string());
            record.clone()
        }))
    }
}

// -- fake clients -----------------------------------------------------------

/// Emits each delta after `step`.
struct Paced {
    deltas: Vec<&'static str>,
    step: Duration,
}

#[async_trait]
impl GenerationClient for Paced {
    async fn stream_chat(
        &self,
        _messages: &[Message],
        _params: &GenerationParameters,
    ) -> Result<DeltaStream, GenerationError> {
        let step = self.step;
        let deltas: Vec<String> = self.deltas.iter().map(|d| d.to_string()).collect();
        Ok(Box::pin(futures_util::stream::iter(deltas).then(
            move |delta| async move {
                tokio::time::sleep(step).await;
                Ok(delta)
            },
        )))
    }
}

/// First attempt breaks after one delta, later attempts succeed.
#[derive(Default)]
struct FlakyOnce {
    calls: AtomicU32,
}

#[async_trait]
impl GenerationClient for FlakyOnce {
    async fn stream_chat(
        &self,
        _messages: &[Message],
        _params: &GenerationParameters,
    ) -> Result<DeltaStream, GenerationError> {
        let items: Vec<Result<String, GenerationError>> =
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                vec![Ok("partial".into()), Err(GenerationError::Timeout)]
            } else {
                vec![Ok("whole".into())]
            };
        Ok(Box::pin(futures_util::stream::iter(items)))
    }
}

struct Unreachable;

#[async_trait]
impl GenerationClient for Unreachable {
    async fn stream_chat(
        &self,
        _messages: &[Message],
        _params: &GenerationParameters,
    ) -> Result<DeltaStream, GenerationError> {
        Err(GenerationError::Network("connection refused".into()))
    }
}

fn paced(deltas: Vec<&'static str>, step_secs: u64) -> Arc<dyn GenerationClient> {
    Arc::new(Paced {
        deltas,
        step: Duration::from_secs(step_secs),
    })
}

fn settings() -> SessionSettings {
    SessionSettings {
        retry: RetryPolicy {
            max_attempts: 2,
            backoff: Duration::ZERO,
            ..RetryPolicy::default()
        },
        ..SessionSettings::default()
    }
}

fn session(store: &Arc<FakeStore>) -> SessionState {
    SessionState::new(store.clone(), settings())
}

// -- tests ------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn reply_is_recorded_and_saved() {
    let store = Arc::new(FakeStore::default());
    let mut state = session(&store);

    let mut seen = Vec::new();
    let outcome = state
        .submit(
            paced(vec!["Hel", "lo"], 1),
            GenerationParameters::default(),
            "hi",
            |e| seen.push(e.clone()),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, TurnStatus::Completed);
    assert_eq!(outcome.reply, "Hello");
    assert_eq!(outcome.session_id.as_deref(), Some("20250101_000000_chat"));
    assert_eq!(seen.len(), 2);
    assert_eq!(state.record().turns, vec![Turn::answered("hi", "Hello")]);
    assert!(!state.is_generating());

    let stored = store.stored("20250101_000000_chat").unwrap();
    assert_eq!(stored.turns, state.record().turns);
}

#[tokio::test(start_paused = true)]
async fn autosave_is_throttled_with_one_forced_save_at_end() {
    let store = Arc::new(FakeStore::default());
    let mut state = session(&store);

    // Ten deltas, one every 10 s, against a 30 s interval.
    let deltas = vec!["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];
    state
        .submit(paced(deltas, 10), GenerationParameters::default(), "count", |_| {})
        .await
        .unwrap();

    assert_eq!(store.unforced(), 3);
    assert_eq!(store.forced(), 1);
    assert_eq!(store.calls().last(), Some(&(true, 1)));
}

#[tokio::test(start_paused = true)]
async fn stop_from_another_task_keeps_partial_reply() {
    let store = Arc::new(FakeStore::default());
    let mut state = session(&store);

    let control = state.control();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(control.stop());
    });

    let outcome = state
        .submit(
            paced(vec!["a", "b", "c", "d"], 1),
            GenerationParameters::default(),
            "letters",
            |_| {},
        )
        .await
        .unwrap();

    assert!(outcome.stopped());
    assert_eq!(outcome.reply, "ab");
    assert_eq!(state.record().turns[0].assistant.as_deref(), Some("ab"));
    assert_eq!(store.forced(), 1);
    assert!(!state.is_generating());
}

#[tokio::test(start_paused = true)]
async fn stop_while_idle_does_not_affect_next_turn() {
    let store = Arc::new(FakeStore::default());
    let mut state = session(&store);

    assert!(!state.control().stop());
    let outcome = state
        .submit(paced(vec!["fine"], 1), GenerationParameters::default(), "hi", |_| {})
        .await
        .unwrap();
    assert_eq!(outcome.status, TurnStatus::Completed);
}

#[tokio::test]
async fn invalid_message_changes_nothing() {
    let store = Arc::new(FakeStore::default());
    let mut state = session(&store);

    let err = state
        .submit(paced(vec!["x"], 0), GenerationParameters::default(), "  \n", |_| {})
        .await
        .unwrap_err();

    assert_eq!(err, ValidationError::EmptyMessage);
    assert!(state.record().turns.is_empty());
    assert!(store.calls().is_empty());
    assert!(!state.is_generating());
}

#[tokio::test]
async fn exhausted_retries_become_reply_text() {
    let store = Arc::new(FakeStore::default());
    let mut state = session(&store);

    let outcome = state
        .submit(Arc::new(Unreachable), GenerationParameters::default(), "hi", |_| {})
        .await
        .unwrap();

    assert!(outcome.failed());
    let expected =
        "Error: Failed to generate response after 2 attempts. network error: connection refused";
    assert_eq!(outcome.reply, expected);
    assert_eq!(state.record().turns[0].assistant.as_deref(), Some(expected));
    assert_eq!(store.forced(), 1);
}

#[tokio::test]
async fn restart_replaces_partial_reply() {
    let store = Arc::new(FakeStore::default());
    let mut state = session(&store);

    let mut restarts = 0;
    let outcome = state
        .submit(
            Arc::new(FlakyOnce::default()),
            GenerationParameters::default(),
            "hi",
            |e| {
                if matches!(e, TurnEvent::Restart { .. }) {
                    restarts += 1;
                }
            },
        )
        .await
        .unwrap();

    assert_eq!(restarts, 1);
    assert_eq!(outcome.reply, "whole");
    assert_eq!(state.record().turns[0].assistant.as_deref(), Some("whole"));
}

#[tokio::test(start_paused = true)]
async fn failed_save_is_retried_after_cooldown() {
    let store = FakeStore::failing(1);
    let mut state = session(&store);

    state
        .submit(paced(vec!["ok"], 0), GenerationParameters::default(), "hi", |_| {})
        .await
        .unwrap();
    assert!(state.has_pending_save());
    assert_eq!(store.calls().len(), 1);

    // Still inside the cooldown: no new attempt.
    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(state.check_pending_saves().await);
    assert_eq!(store.calls().len(), 1);

    tokio::time::advance(Duration::from_secs(3)).await;
    assert!(!state.check_pending_saves().await);
    assert_eq!(store.calls().len(), 2);
    assert!(store.stored("20250101_000000_chat").is_some());
}

#[tokio::test(start_paused = true)]
async fn pending_save_is_retried_during_next_reply() {
    let store = FakeStore::failing(1);
    let mut state = session(&store);

    state
        .submit(paced(vec!["ok"], 0), GenerationParameters::default(), "first", |_| {})
        .await
        .unwrap();
    assert!(state.has_pending_save());

    // Deltas every 2 s; the retry fires at the first delta past the 5 s cooldown.
    state
        .submit(
            paced(vec!["a", "b", "c", "d"], 2),
            GenerationParameters::default(),
            "second",
            |_| {},
        )
        .await
        .unwrap();

    let calls = store.calls();
    assert_eq!(calls[0], (true, 1));
    assert_eq!(calls[1], (true, 2), "recovery save during streaming");
    assert!(!state.has_pending_save());
}

#[tokio::test]
async fn resume_rename_and_delete() {
    let store = Arc::new(FakeStore::default());
    let mut state = session(&store);

    let mut stored = SessionRecord::with_title("Old talk");
    stored.id = Some("20240101_000000_Old_talk".into());
    stored.turns.push(Turn::answered("q", "a"));
    store
        .inner
        .lock()
        .unwrap()
        .records
        .insert("20240101_000000_Old_talk".into(), stored.clone());

    assert!(!state.resume("nope").await.unwrap());
    assert!(state.resume("20240101_000000_Old_talk").await.unwrap());
    assert_eq!(state.record(), &stored);

    state.rename("New talk").await.unwrap();
    assert_eq!(state.record().title.as_deref(), Some("New talk"));
    assert_eq!(
        store.stored("20240101_000000_Old_talk").unwrap().title.as_deref(),
        Some("New talk")
    );

    assert!(state.delete().await.unwrap());
    assert!(state.id().is_none());
    assert!(store.stored("20240101_000000_Old_talk").is_none());
}

#[tokio::test]
async fn rename_before_first_save_sets_title() {
    let store = Arc::new(FakeStore::default());
    let mut state = session(&store);

    state.rename("  Planned title ").await.unwrap();
    assert_eq!(state.record().title.as_deref(), Some("Planned title"));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn new_conversation_starts_empty() {
    let store = Arc::new(FakeStore::default());
    let mut state = session(&store);
    state
        .submit(paced(vec!["x"], 0), GenerationParameters::default(), "hi", |_| {})
        .await
        .unwrap();
    assert!(state.id().is_some());

    state.new_conversation().await.unwrap();
    assert!(state.id().is_none());
    assert!(state.record().turns.is_empty());
}
