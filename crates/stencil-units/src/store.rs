//! Key-value persistence behind the manifest
//!
//! [`FileStore`] keeps one document per key under a directory. Writers take
//! an exclusive advisory lock on `{dir}/.lock`, write to a temporary file in
//! the same directory and rename it over the target, so readers never see a
//! partially written document.

use crate::error::{IoResultExt, UnitError, UnitResult};
use fs4::fs_std::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

/// Simple string store the manifest is persisted through
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> UnitResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> UnitResult<()>;

    fn remove(&self, key: &str) -> UnitResult<()>;
}

const LOCK_FILE_NAME: &str = ".lock";

/// Directory-backed store, one JSON document per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> UnitResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).at_path(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> UnitResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
            && !key.starts_with('.');
        if !valid {
            return Err(UnitError::store(key, "invalid key"));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    fn lock_file(&self) -> UnitResult<File> {
        let path = self.dir.join(LOCK_FILE_NAME);
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .at_path(&path)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> UnitResult<Option<String>> {
        let path = self.path_for(key)?;
        let lock = self.lock_file()?;
        lock.lock_shared().at_path(&self.dir)?;

        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(UnitError::filesystem(&path, e)),
        }
        // Lock is released when `lock` is dropped
    }

    fn set(&self, key: &str, value: &str) -> UnitResult<()> {
        let path = self.path_for(key)?;
        let lock = self.lock_file()?;
        lock.lock_exclusive().at_path(&self.dir)?;

        let mut temp = NamedTempFile::new_in(&self.dir).at_path(&self.dir)?;
        temp.write_all(value.as_bytes()).at_path(temp.path())?;
        temp.as_file().sync_all().at_path(temp.path())?;
        temp.persist(&path)
            .map_err(|e| UnitError::filesystem(&path, e.error))?;

        debug!("Stored {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> UnitResult<()> {
        let path = self.path_for(key)?;
        let lock = self.lock_file()?;
        lock.lock_exclusive().at_path(&self.dir)?;

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(UnitError::filesystem(&path, e)),
        }
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> UnitResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> UnitResult<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> UnitResult<()> {
        self.entries().remove(key);
        Ok(())
    }
}
