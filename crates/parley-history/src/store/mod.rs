//! Session persistence.
//!
//! Every session is one pretty-printed JSON document, `<id>.json`, inside the
//! history directory. Writes go through [`atomic`] and are serialized per id;
//! saves of different sessions run concurrently.

mod atomic;


use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parley_common::{is_valid_session_id, mint_session_id, PersistenceError};
use tokio::fs;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::record::{SessionRecord, SessionSummary, StoredSession, StoredSessionRef};
use crate::title::{resolve_title, TitleGenerator};

/// Default minimum spacing between non-forced saves of one session.
pub const DEFAULT_MIN_SAVE_INTERVAL: Duration = Duration::from_secs(30);

const EXTENSION: &str = "json";

/// Persistence operations a live session needs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist `record`, assigning its id and title on first save.
    ///
    /// A non-forced save of an already persisted record is skipped if the
    /// last successful save was too recent; the existing id is returned.
    async fn save(&self, record: &mut SessionRecord, force: bool)
        -> Result<String, PersistenceError>;

    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, PersistenceError>;

    /// Returns whether a file was removed. Deleting a missing id is not an
    /// error.
    async fn delete(&self, id: &str) -> Result<bool, PersistenceError>;

    /// Replace the stored title. Returns the updated record, or `None` if
    /// no session with that id exists.
    async fn rename(
        &self,
        id: &str,
        title: &str,
    ) -> Result<Option<SessionRecord>, PersistenceError>;
}

#[derive(Default)]
struct Slot {
    last_saved: Option<Instant>,
}

/// JSON-file session store rooted at one directory.
pub struct HistoryStore {
    dir: PathBuf,
    min_save_interval: Duration,
    titles: Option<Arc<dyn TitleGenerator>>,
    slots: StdMutex<HashMap<String, Arc<Mutex<Slot>>>>,
}

impl HistoryStore {
    /// Open (creating if needed) the history directory and clear out staging
    /// files left by an interrupted write.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| PersistenceError::io(&dir, e))?;
        atomic::sweep_temp_files(&dir, atomic::TEMP_GRACE).await?;
        info!(dir = %dir.display(), "history store opened");
        Ok(Self {
            dir,
            min_save_interval: DEFAULT_MIN_SAVE_INTERVAL,
            titles: None,
            slots: StdMutex::new(HashMap::new()),
        })
    }

    pub fn with_min_save_interval(mut self, interval: Duration) -> Self {
        self.min_save_interval = interval;
        self
    }

    pub fn with_titles(mut self, titles: Arc<dyn TitleGenerator>) -> Self {
        self.titles = Some(titles);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All readable sessions, most recently modified first.
    pub async fn list(&self) -> Result<Vec<SessionSummary>, PersistenceError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistenceError::io(&self.dir, e)),
        };

        let now = Utc::now();
        let mut summaries = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PersistenceError::io(&self.dir, e))?
        {
            let path = entry.path();
            if atomic::is_temp_file(&path)
                || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION)
            {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match read_document(&path).await {
                Ok(Some(doc)) => match doc.into_record(id, now) {
                    Some(record) => summaries.push(SessionSummary {
                        id: id.to_string(),
                        title: record.display_title().to_string(),
                        last_modified_at: record.last_modified_at.unwrap_or(now),
                    }),
                    None => debug!(path = %path.display(), "skipping session without turns"),
                },
                Ok(None) => {}
                Err(e) => warn!("skipping unreadable session: {e}"),
            }
        }

        summaries.sort_by(|a, b| {
            b.last_modified_at
                .cmp(&a.last_modified_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(summaries)
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{EXTENSION}"))
    }

    fn slot(&self, id: &str) -> Arc<Mutex<Slot>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        prune_idle(&mut slots, self.min_save_interval);
        slots.entry(id.to_string()).or_default().clone()
    }

    /// Reserve `id` for a new session. Fails if another save already holds it.
    fn reserve(&self, id: &str) -> Option<Arc<Mutex<Slot>>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        prune_idle(&mut slots, self.min_save_interval);
        if slots.contains_key(id) {
            return None;
        }
        let slot = Arc::new(Mutex::new(Slot::default()));
        slots.insert(id.to_string(), slot.clone());
        Some(slot)
    }

    fn release(&self, id: &str) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    /// Pick `base`, or `base_2`, `base_3`, ... if it is taken on disk or by a
    /// concurrent first save.
    async fn claim_id(&self, base: &str) -> Result<(String, Arc<Mutex<Slot>>), PersistenceError> {
        let mut n = 1u32;
        loop {
            let candidate = if n == 1 {
                base.to_string()
            } else {
                format!("{base}_{n}")
            };
            let path = self.path_for(&candidate);
            let taken = fs::try_exists(&path)
                .await
                .map_err(|e| PersistenceError::io(&path, e))?;
            if !taken {
                if let Some(slot) = self.reserve(&candidate) {
                    return Ok((candidate, slot));
                }
            }
            n += 1;
        }
    }

    async fn save_new(&self, record: &mut SessionRecord) -> Result<String, PersistenceError> {
        let now = Utc::now();
        let title = match record.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => resolve_title(self.titles.as_deref(), &record.turns, now).await,
        };
        let (id, slot) = self.claim_id(&mint_session_id(now, &title)).await?;

        let mut guard = slot.lock().await;
        if let Err(e) = self.write(&id, &title, record, now).await {
            drop(guard);
            self.release(&id);
            return Err(e);
        }
        guard.last_saved = Some(Instant::now());

        record.id = Some(id.clone());
        record.title = Some(title);
        record.created_at = Some(now);
        record.last_modified_at = Some(now);
        info!(%id, "session created");
        Ok(id)
    }

    async fn save_existing(
        &self,
        record: &mut SessionRecord,
        id: String,
        force: bool,
    ) -> Result<String, PersistenceError> {
        check_id(&id)?;
        let slot = self.slot(&id);
        let mut guard = slot.lock().await;

        if !force {
            if let Some(last) = guard.last_saved {
                if last.elapsed() < self.min_save_interval {
                    debug!(%id, "save skipped, last save too recent");
                    return Ok(id);
                }
            }
        }

        let now = Utc::now();
        let title = record.title.clone().unwrap_or_else(|| id.clone());
        self.write(&id, &title, record, now).await?;
        guard.last_saved = Some(Instant::now());

        record.title = Some(title);
        record.created_at.get_or_insert(now);
        record.last_modified_at = Some(now);
        debug!(%id, force, turns = record.turns.len(), "session saved");
        Ok(id)
    }

    async fn write(
        &self,
        id: &str,
        title: &str,
        record: &SessionRecord,
        now: chrono::DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let doc = StoredSessionRef {
            id,
            title,
            turns: &record.turns,
            created_at: record.created_at.unwrap_or(now),
            last_modified_at: now,
        };
        write_document(&self.path_for(id), &doc).await
    }
}

#[async_trait]
impl RecordStore for HistoryStore {
    async fn save(
        &self,
        record: &mut SessionRecord,
        force: bool,
    ) -> Result<String, PersistenceError> {
        if record.is_empty() {
            return Err(PersistenceError::EmptyRecord);
        }
        match record.id.clone() {
            Some(id) => self.save_existing(record, id, force).await,
            None => self.save_new(record).await,
        }
    }

    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, PersistenceError> {
        check_id(id)?;
        let path = self.path_for(id);
        let Some(doc) = read_document(&path).await? else {
            return Ok(None);
        };
        let record = doc.into_record(id, Utc::now());
        if record.is_none() {
            debug!(%id, "session document has no turns");
        }
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<bool, PersistenceError> {
        check_id(id)?;
        let path = self.path_for(id);
        let slot = self.slot(id);
        let removed = {
            let _guard = slot.lock().await;
            match fs::remove_file(&path).await {
                Ok(()) => true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                Err(e) => return Err(PersistenceError::io(&path, e)),
            }
        };
        self.release(id);
        if removed {
            info!(%id, "session deleted");
        }
        Ok(removed)
    }

    async fn rename(
        &self,
        id: &str,
        title: &str,
    ) -> Result<Option<SessionRecord>, PersistenceError> {
        check_id(id)?;
        let slot = self.slot(id);
        let _guard = slot.lock().await;

        let Some(mut record) = self.load(id).await? else {
            return Ok(None);
        };
        let title = match title.trim() {
            "" => id.to_string(),
            t => t.to_string(),
        };
        // The modification time tracks conversation activity, not titles.
        let doc = StoredSessionRef {
            id,
            title: &title,
            turns: &record.turns,
            created_at: record.created_at.unwrap_or_else(Utc::now),
            last_modified_at: record.last_modified_at.unwrap_or_else(Utc::now),
        };
        write_document(&self.path_for(id), &doc).await?;
        info!(%id, %title, "session renamed");
        record.title = Some(title);
        Ok(Some(record))
    }
}

/// Drop slots nobody holds whose debounce window has passed. Such a slot
/// carries no state a fresh one would not, so the map only holds sessions
/// saved within the last interval or currently being written.
fn prune_idle(slots: &mut HashMap<String, Arc<Mutex<Slot>>>, interval: Duration) {
    slots.retain(|_, slot| {
        if Arc::strong_count(slot) > 1 {
            return true;
        }
        match slot.try_lock() {
            Ok(state) => state
                .last_saved
                .is_some_and(|at| at.elapsed() < interval),
            Err(_) => true,
        }
    });
}

fn check_id(id: &str) -> Result<(), PersistenceError> {
    if is_valid_session_id(id) {
        Ok(())
    } else {
        Err(PersistenceError::InvalidId(id.to_string()))
    }
}

async fn write_document(path: &Path, doc: &StoredSessionRef<'_>) -> Result<(), PersistenceError> {
    let json =
        serde_json::to_vec_pretty(doc).map_err(|e| PersistenceError::Serialize(e.to_string()))?;
    atomic::write_atomic(path, &json).await
}

/// `Ok(None)` when the file does not exist.
async fn read_document(path: &Path) -> Result<Option<StoredSession>, PersistenceError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PersistenceError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| PersistenceError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}
