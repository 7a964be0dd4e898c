//! Persisted disk tier.
//!
//! One JSON file per cache entry, named by the URL-safe base64 of the
//! key, inside a dedicated directory. Entries carry their insertion
//! timestamp and expire after a day: journeys computed against a fixed
//! static timetable stay correct for a whole service day.
//!
//! Writes go through a temp file and an atomic rename, so a reader
//! racing a writer or the cleanup pass sees either the old entry, the
//! new entry, or a miss, never a torn one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::memory::MemoryTier;
use crate::domain::JourneyResult;

/// Default validity: 24 hours.
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors from disk tier writes. Reads never error; they degrade to a
/// miss.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Cache directory could not be created
    #[error("cache directory error: {message}")]
    Directory { message: String },

    /// Entry could not be serialized
    #[error("failed to serialize cache entry: {message}")]
    Serialize { message: String },

    /// Entry could not be written
    #[error("failed to write cache entry: {message}")]
    Write { message: String },
}

/// A cache entry with its insertion timestamp.
#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    /// Unix timestamp when the entry was written.
    cached_at_secs: u64,
    /// The cached journeys.
    journeys: Vec<JourneyResult>,
}

/// Configuration for the disk tier.
#[derive(Debug, Clone)]
pub struct DiskTierConfig {
    /// Directory holding the entry files.
    pub directory: PathBuf,

    /// How long an entry remains valid.
    pub ttl: Duration,
}

impl DiskTierConfig {
    /// Create a config with the given directory and the default TTL
    /// (24 hours).
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Set a custom TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl Default for DiskTierConfig {
    fn default() -> Self {
        Self::new("journey_cache")
    }
}

/// Read-side statistics of the disk tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatistics {
    /// Entry files currently on disk, valid or not.
    pub entry_count: u64,

    /// Lookups answered from disk since startup.
    pub hits: u64,

    /// Lookups that missed since startup.
    pub misses: u64,
}

/// Persisted journey cache surviving process restarts.
pub struct DiskTier {
    config: DiskTierConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DiskTier {
    /// Create a new disk tier with the given config. The directory is
    /// created lazily on first write.
    pub fn new(config: DiskTierConfig) -> Self {
        Self {
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn file_for_key(&self, key: &str) -> PathBuf {
        let name = URL_SAFE_NO_PAD.encode(key.as_bytes());
        self.config.directory.join(format!("{name}.json"))
    }

    fn key_for_file(path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_str()?;
        let bytes = URL_SAFE_NO_PAD.decode(stem).ok()?;
        String::from_utf8(bytes).ok()
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Load and validate one entry file. `None` on missing, unreadable,
    /// or expired entries.
    fn load_entry(&self, path: &Path) -> Option<Vec<JourneyResult>> {
        // File age is a free expiry check before paying the parse cost.
        // The embedded timestamp below stays authoritative.
        let metadata = std::fs::metadata(path).ok()?;
        if let Ok(modified) = metadata.modified()
            && let Ok(age) = modified.elapsed()
            && age >= self.config.ttl
        {
            return None;
        }

        let contents = std::fs::read_to_string(path).ok()?;
        let entry: DiskEntry = serde_json::from_str(&contents).ok()?;

        let age_secs = Self::now_secs().saturating_sub(entry.cached_at_secs);
        if age_secs >= self.config.ttl.as_secs() {
            return None;
        }

        Some(entry.journeys)
    }

    /// Keyed lookup. Misses on absent, unreadable, and expired entries.
    pub fn get(&self, key: &str) -> Option<Vec<JourneyResult>> {
        match self.load_entry(&self.file_for_key(key)) {
            Some(journeys) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(journeys)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Persist an entry, replacing any previous value for the key.
    ///
    /// Callers treat persistence as fire-and-forget; failures here are
    /// logged by the caller and never affect the routing answer.
    pub fn put(&self, key: &str, journeys: &[JourneyResult]) -> Result<(), CacheError> {
        if !self.config.directory.exists() {
            std::fs::create_dir_all(&self.config.directory).map_err(|e| {
                CacheError::Directory {
                    message: e.to_string(),
                }
            })?;
        }

        let entry = DiskEntry {
            cached_at_secs: Self::now_secs(),
            journeys: journeys.to_vec(),
        };
        let json = serde_json::to_string(&entry).map_err(|e| CacheError::Serialize {
            message: e.to_string(),
        })?;

        let path = self.file_for_key(key);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| CacheError::Write {
            message: e.to_string(),
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| CacheError::Write {
            message: e.to_string(),
        })?;

        Ok(())
    }

    /// Copy every still-valid entry into the memory tier. Best-effort:
    /// unreadable entries are skipped, a missing directory preloads
    /// nothing. Returns the number of entries promoted.
    pub fn preload(&self, memory: &MemoryTier) -> usize {
        let mut promoted = 0;

        for path in self.entry_files() {
            let Some(key) = Self::key_for_file(&path) else {
                debug!(path = %path.display(), "skipping cache file with undecodable name");
                continue;
            };
            if let Some(journeys) = self.load_entry(&path) {
                memory.insert(key, std::sync::Arc::new(journeys));
                promoted += 1;
            }
        }

        debug!(promoted, "disk cache preload finished");
        promoted
    }

    /// Delete every expired entry file. Safe to run concurrently with
    /// get/put traffic: entries are whole files, replaced atomically.
    /// Returns the number of files removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut removed = 0;

        for path in self.entry_files() {
            if self.load_entry(&path).is_some() {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to remove expired cache entry");
                }
            }
        }

        debug!(removed, "disk cache cleanup finished");
        removed
    }

    /// Current statistics. Read-only, no side effects.
    pub fn statistics(&self) -> CacheStatistics {
        CacheStatistics {
            entry_count: self.entry_files().len() as u64,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn entry_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.config.directory) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect()
    }
}
