//! Disk-backed query result cache.
//!
//! Every entry lives in its own JSON file under `<root>/entries/`, named by
//! the SHA-256 of the cache key, and holds `(key, cached_at, value)`. Each
//! write is staged in its own temp file and renamed over the entry, so a
//! reader never sees a torn entry. Unparsable entries are dropped by
//! [`ResultCache::sweep`] and by [`ResultCache::get_or_discard`].
//!
//! The cache assumes a single writer. Two processes sharing one cache
//! directory get no mutual exclusion: the last `put` for a key wins, even if
//! it carries an older result.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::Builder;
use tracing::{debug, info, warn};

use crate::domain::QueryResult;
use crate::error::SckanError;

pub const SECONDS_PER_DAY: i64 = 86_400;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub cached_at: DateTime<Utc>,
    pub value: QueryResult,
}

#[derive(Clone)]
pub struct ResultCache {
    root: Utf8PathBuf,
    max_cache_days: u32,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("root", &self.root)
            .field("max_cache_days", &self.max_cache_days)
            .finish_non_exhaustive()
    }
}

impl ResultCache {
    pub fn open(root: impl Into<Utf8PathBuf>, max_cache_days: u32) -> Result<Self, SckanError> {
        Self::open_with_clock(root, max_cache_days, Arc::new(SystemClock))
    }

    /// Opens (creating if needed) the cache directory and checks that it is
    /// writable before any query runs.
    pub fn open_with_clock(
        root: impl Into<Utf8PathBuf>,
        max_cache_days: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SckanError> {
        let root = root.into();
        let entries = root.join("entries");
        fs::create_dir_all(entries.as_std_path())
            .map_err(|err| SckanError::Storage(format!("create {entries}: {err}")))?;
        Builder::new()
            .prefix(".probe")
            .tempfile_in(entries.as_std_path())
            .map_err(|err| SckanError::Storage(format!("{entries} is not writable: {err}")))?;
        Ok(Self {
            root,
            max_cache_days,
            clock,
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn max_cache_days(&self) -> u32 {
        self.max_cache_days
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn ttl(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.max_cache_days) * SECONDS_PER_DAY)
    }

    /// True when the entry is older than `max_cache_days`.
    pub fn is_stale(&self, cached_at: DateTime<Utc>) -> bool {
        self.now() - cached_at > self.ttl()
    }

    pub fn entry_path(&self, key: &str) -> Utf8PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.entries_dir().join(format!("{digest:x}.json"))
    }

    /// Plain lookup; the caller decides whether the entry is still fresh.
    /// An unparsable entry file is a `Storage` error.
    pub fn get(&self, key: &str) -> Result<Option<(DateTime<Utc>, QueryResult)>, SckanError> {
        let path = self.entry_path(key);
        let Some(content) = read_file(&path)? else {
            return Ok(None);
        };
        Ok(self.matching(key, &path, decode_entry(&path, &content)?))
    }

    /// Like [`ResultCache::get`], but an unparsable entry file is deleted and
    /// reported as absent.
    pub fn get_or_discard(
        &self,
        key: &str,
    ) -> Result<Option<(DateTime<Utc>, QueryResult)>, SckanError> {
        let path = self.entry_path(key);
        let Some(content) = read_file(&path)? else {
            return Ok(None);
        };
        match decode_entry(&path, &content) {
            Ok(entry) => Ok(self.matching(key, &path, entry)),
            Err(err) => {
                warn!(path = %path, error = %err, "discarding corrupt cache entry");
                remove_file(&path)?;
                Ok(None)
            }
        }
    }

    fn matching(
        &self,
        key: &str,
        path: &Utf8Path,
        entry: CacheEntry,
    ) -> Option<(DateTime<Utc>, QueryResult)> {
        if entry.key != key {
            debug!(path = %path, "cache entry key mismatch");
            return None;
        }
        Some((entry.cached_at, entry.value))
    }

    /// Stages the entry in a uniquely named temp file next to its target and
    /// renames it into place.
    pub fn put(&self, key: &str, value: &QueryResult) -> Result<(), SckanError> {
        let entry = CacheEntry {
            key: key.to_string(),
            cached_at: self.now(),
            value: value.clone(),
        };
        let path = self.entry_path(key);
        let content =
            serde_json::to_vec(&entry).map_err(|err| SckanError::Storage(err.to_string()))?;
        let entries = self.entries_dir();
        let mut staged = Builder::new()
            .prefix(".entry")
            .suffix(".tmp")
            .tempfile_in(entries.as_std_path())
            .map_err(|err| SckanError::Storage(format!("stage in {entries}: {err}")))?;
        staged
            .write_all(&content)
            .map_err(|err| SckanError::Storage(format!("write {path}: {err}")))?;
        staged
            .persist(path.as_std_path())
            .map_err(|err| SckanError::Storage(format!("rename into {path}: {}", err.error)))?;
        debug!(path = %path, rows = value.rows().len(), "cache put");
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<bool, SckanError> {
        remove_file(&self.entry_path(key))
    }

    /// Removes every entry older than `max_cache_days`, plus unparsable
    /// entry files; returns how many went.
    pub fn sweep(&self) -> Result<usize, SckanError> {
        let mut removed = 0;
        let mut corrupt = 0;
        for path in self.entry_files()? {
            let Some(content) = read_file(&path)? else {
                continue;
            };
            let expired = match decode_entry(&path, &content) {
                Ok(entry) => self.is_stale(entry.cached_at),
                Err(err) => {
                    warn!(path = %path, error = %err, "removing corrupt cache entry");
                    corrupt += 1;
                    true
                }
            };
            if expired && remove_file(&path)? {
                removed += 1;
            }
        }
        info!(removed, corrupt, "cache sweep finished");
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize, SckanError> {
        Ok(self.entry_files()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, SckanError> {
        Ok(self.len()? == 0)
    }

    fn entries_dir(&self) -> Utf8PathBuf {
        self.root.join("entries")
    }

    fn entry_files(&self) -> Result<Vec<Utf8PathBuf>, SckanError> {
        let dir = self.entries_dir();
        let listing = fs::read_dir(dir.as_std_path())
            .map_err(|err| SckanError::Storage(format!("list {dir}: {err}")))?;
        let mut files = Vec::new();
        for item in listing {
            let item = item.map_err(|err| SckanError::Storage(err.to_string()))?;
            let Ok(path) = Utf8PathBuf::from_path_buf(item.path()) else {
                continue;
            };
            if path.extension() == Some("json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn read_file(path: &Utf8Path) -> Result<Option<Vec<u8>>, SckanError> {
    match fs::read(path.as_std_path()) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(SckanError::Storage(format!("read {path}: {err}"))),
    }
}

fn decode_entry(path: &Utf8Path, content: &[u8]) -> Result<CacheEntry, SckanError> {
    serde_json::from_slice(content)
        .map_err(|err| SckanError::Storage(format!("corrupt entry {path}: {err}")))
}

fn remove_file(path: &Utf8Path) -> Result<bool, SckanError> {
    match fs::remove_file(path.as_std_path()) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(SckanError::Storage(format!("remove {path}: {err}"))),
    }
}
