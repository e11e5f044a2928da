//! On-disk icon cache: name -> base64 PNG, stored as one JSON object per plugin.
//!
//! Access is scoped: `open` takes an exclusive lock and loads the map, lookups
//! and fills happen in memory, `close` writes the map atomically (temp file +
//! rename) and releases the lock. Concurrent invocations of the same plugin
//! serialize on the lock instead of clobbering each other's writes.
//!
//! The cache never fails a menu. When the lock or directory is unavailable the
//! cache runs in memory only, and a failed write is logged.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::errors::MenuError;
use crate::lock::{acquire_lock_at, lock_path_for, FileLock};
use crate::util::fs::ensure_parent_dir;

const LOCK_WAIT: Duration = Duration::from_secs(2);

/// Neutral 10x10 grey circle, used when an icon cannot be fetched.
pub const FALLBACK_ICON: &str = "iVBORw0KGgoAAAANSUhEUgAAAAoAAAAKCAYAAACNMs+9AAAACXBIWXMAAA7EAAAOxAGVKw4bAAAAnElEQVQYlX3QMUpDARCE4W8eOVLIESSnUUKCNgaLdCHw0JOIWHkBm+CVJkVeIZpkYdhi/hmWDbztNrAsa+0CJMcw4vN+e5AJesbO5dnjaYa7ttcgeEzyPdOukmgryWW0XQ2S+RVTe96S+aztL69/aZ1CQ+KYxE1xHMjY1k0xDvhK8nJ+3f827MN74HW3EZZt10kW070/GCUfD9uDE5f3VCMES6L5AAAAAElFTkSuQmCC";

/// `<cache-dir>/<plugin>-cache.json`
pub fn cache_file_for(cache_dir: &Path, plugin: &str) -> PathBuf {
    cache_dir.join(format!("{plugin}-cache.json"))
}

#[derive(Debug)]
pub struct IconCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    dirty: bool,
    lock: Option<FileLock>,
}

impl IconCache {
    /// Lock and load the cache at `path`, starting empty when the file is
    /// missing or unreadable as a JSON object of strings. Without the lock the
    /// cache is memory-only and `close` writes nothing.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock = ensure_parent_dir(&path)
            .and_then(|_| acquire_lock_at(&lock_path_for(&path), LOCK_WAIT))
            .map_err(|e| cache_err(&path, e));
        let lock = match lock {
            Ok(lock) => lock,
            Err(e) => {
                tracing::warn!(error = %e, "icon cache unavailable; using memory only");
                return Self::in_memory(path);
            }
        };
        let entries = load_entries(&path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "icon cache unreadable; starting empty");
            BTreeMap::new()
        });
        tracing::debug!(path = %path.display(), entries = entries.len(), "icon cache opened");
        Self {
            path,
            entries,
            dirty: false,
            lock: Some(lock),
        }
    }

    fn in_memory(path: PathBuf) -> Self {
        Self {
            path,
            entries: BTreeMap::new(),
            dirty: false,
            lock: None,
        }
    }

    /// True when entries will be written back on close.
    pub fn is_persistent(&self) -> bool {
        self.lock.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Return the cached icon for `name`, fetching and storing it on a miss.
    pub fn get_or_fetch<F>(&mut self, name: &str, fetch: F) -> Result<String, MenuError>
    where
        F: FnOnce() -> Result<Vec<u8>, MenuError>,
    {
        if let Some(hit) = self.entries.get(name) {
            return Ok(hit.clone());
        }
        let bytes = fetch()?;
        let encoded = STANDARD.encode(bytes);
        tracing::debug!(name, "icon cache miss filled");
        self.entries.insert(name.to_string(), encoded.clone());
        self.dirty = true;
        Ok(encoded)
    }

    /// Like `get_or_fetch`, but a failed fetch yields `FALLBACK_ICON` and is not cached.
    pub fn get_or_fallback<F>(&mut self, name: &str, fetch: F) -> String
    where
        F: FnOnce() -> Result<Vec<u8>, MenuError>,
    {
        match self.get_or_fetch(name, fetch) {
            Ok(icon) => icon,
            Err(e) => {
                tracing::warn!(name, error = %e, "icon fetch failed; using fallback");
                FALLBACK_ICON.to_string()
            }
        }
    }

    /// Persist pending entries and release the lock. A failed write is logged.
    pub fn close(mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "icon cache not saved");
        }
        self.lock.take();
    }

    fn flush(&mut self) -> Result<(), MenuError> {
        if !self.dirty || self.lock.is_none() {
            return Ok(());
        }
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let body = serde_json::to_vec(&self.entries)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| cache_err(&self.path, e))?;
        tmp.write_all(&body).map_err(|e| cache_err(&self.path, e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| cache_err(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| cache_err(&self.path, e.error))?;
        self.dirty = false;
        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "icon cache written");
        Ok(())
    }
}

impl Drop for IconCache {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "icon cache not saved");
        }
    }
}

fn load_entries(path: &Path) -> Result<BTreeMap<String, String>, MenuError> {
    let raw = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(cache_err(path, e)),
    };
    match serde_json::from_slice::<BTreeMap<String, String>>(&raw) {
        Ok(map) => Ok(map),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt icon cache; starting empty");
            Ok(BTreeMap::new())
        }
    }
}

fn cache_err(path: &Path, e: impl std::fmt::Display) -> MenuError {
    MenuError::Cache {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Delete every `*-cache.json` (and its lock file) under `cache_dir`.
/// Returns the removed cache files.
pub fn clear_cache_dir(cache_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    let rd = match fs::read_dir(cache_dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(removed),
        Err(e) => return Err(e),
    };
    for entry in rd {
        let path = entry?.path();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        if name.ends_with("-cache.json") {
            fs::remove_file(&path)?;
            let _ = fs::remove_file(lock_path_for(&path));
            removed.push(path);
        }
    }
    removed.sort();
    Ok(removed)
}
