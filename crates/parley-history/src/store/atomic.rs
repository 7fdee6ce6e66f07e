//! Whole-file replacement on disk.
//!
//! A write is staged into a uniquely named `*.tmp` sibling, flushed with
//! `sync_all`, then renamed over the target. Readers only ever see the old
//! file or the new one. There is no in-place fallback.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use parley_common::PersistenceError;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Suffix of staging files. Anything ending in it is never a session.
pub(crate) const TEMP_SUFFIX: &str = ".tmp";

/// Staging files younger than this may belong to a write in progress
/// elsewhere and are left alone.
pub(crate) const TEMP_GRACE: Duration = Duration::from_secs(5 * 60);

/// A fully written, durable staging file waiting to be renamed into place.
pub(crate) struct Staged {
    tmp: PathBuf,
    target: PathBuf,
}

impl Staged {
    pub(crate) fn temp_path(&self) -> &Path {
        &self.tmp
    }
}

/// Write `bytes` to a fresh temp file next to `target` and sync it.
pub(crate) async fn stage(target: &Path, bytes: &[u8]) -> Result<Staged, PersistenceError> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = target.with_file_name(format!(
        "{file_name}.{}{TEMP_SUFFIX}",
        uuid::Uuid::new_v4().simple()
    ));

    let written = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp).await;
        return Err(PersistenceError::io(&tmp, e));
    }
    Ok(Staged {
        tmp,
        target: target.to_path_buf(),
    })
}

/// Rename a staged file over its target. On failure the temp file is
/// removed and the target is untouched.
pub(crate) async fn commit(staged: Staged) -> Result<(), PersistenceError> {
    if let Err(e) = fs::rename(&staged.tmp, &staged.target).await {
        let _ = fs::remove_file(&staged.tmp).await;
        return Err(PersistenceError::io(&staged.target, e));
    }
    Ok(())
}

pub(crate) async fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let staged = stage(target, bytes).await?;
    commit(staged).await
}

/// Remove staging files left behind by an interrupted write, skipping any
/// modified within `grace`.
pub(crate) async fn sweep_temp_files(
    dir: &Path,
    grace: Duration,
) -> Result<usize, PersistenceError> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| PersistenceError::io(dir, e))?;
    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PersistenceError::io(dir, e))?
    {
        let path = entry.path();
        if !is_temp_file(&path) {
            continue;
        }
        let age = entry
            .metadata()
            .await
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok());
        if age.map_or(true, |age| age < grace) {
            debug!(path = %path.display(), "leaving recent temp file");
            continue;
        }
        match fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), "could not remove stale temp file: {e}"),
        }
    }
    if removed > 0 {
        debug!(dir = %dir.display(), removed, "swept stale temp files");
    }
    Ok(removed)
}

pub(crate) fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(TEMP_SUFFIX))
}

/// Backdate `path`'s modification time.
#[cfg(test)]
pub(crate) fn age_file(path: &Path, by: Duration) {
    let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - by).unwrap();
}
