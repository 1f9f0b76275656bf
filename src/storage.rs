//! Keyed JSON blob storage.
//!
//! The conversation transcript and the preferences record each live under
//! their own key. [`FileStorage`] keeps one `<key>.json` file per key inside
//! the data directory; [`MemoryStorage`] backs tests and throwaway sessions.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Key holding the serialized conversation transcript.
pub const CONVERSATION_KEY: &str = "chat_history_v2";
/// Key holding the serialized user preferences.
pub const SETTINGS_KEY: &str = "user_settings_v2";

/// A string-keyed store of serialized blobs.
pub trait BlobStorage: Send + Sync {
    /// Read the blob under `key`, or `None` if it was never written.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob under `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the blob under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// One JSON file per key under a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (or create) the storage directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create data dir: {}", dir.display()))?;
        tracing::debug!(dir = %dir.display(), "file storage ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl BlobStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    /// Atomic write (tmp + rename).
    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, value)
            .with_context(|| format!("failed to write temp file: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("failed to rename temp file to {}", path.display()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}

/// In-process storage. Writes can be made to fail for exercising the
/// best-effort persistence paths.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `write` return an error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl BlobStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        anyhow::ensure!(
            !self.fail_writes.load(Ordering::SeqCst),
            "storage write rejected for key {key}"
        );
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}
