//! In-process memory tier.
//!
//! A bounded LRU of computed journey lists. Capacity eviction belongs
//! to the cache itself; clock validity is layered on top: each entry
//! records its insertion instant, and lookups past the validity window
//! report a miss without evicting. The entry stays resident until the
//! next successful write overwrites it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache as MokaCache;

use crate::domain::JourneyResult;

/// Configuration for the memory tier.
#[derive(Debug, Clone)]
pub struct MemoryTierConfig {
    /// Maximum number of cached entries.
    pub max_capacity: u64,

    /// How long an entry may be served after insertion.
    pub validity: Duration,
}

impl Default for MemoryTierConfig {
    fn default() -> Self {
        Self {
            max_capacity: 200,
            validity: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Clone)]
struct Entry {
    inserted_at: Instant,
    journeys: Arc<Vec<JourneyResult>>,
}

/// Bounded LRU of computed journeys with a time validity window.
pub struct MemoryTier {
    entries: MokaCache<String, Entry>,
    validity: Duration,
}

impl MemoryTier {
    /// Create a new memory tier with the given configuration.
    pub fn new(config: &MemoryTierConfig) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .build();

        Self {
            entries,
            validity: config.validity,
        }
    }

    /// Look up a key. Entries past the validity window report a miss;
    /// they are left in place for the next write to refresh.
    pub fn get(&self, key: &str) -> Option<Arc<Vec<JourneyResult>>> {
        let entry = self.entries.get(key)?;
        if entry.inserted_at.elapsed() > self.validity {
            return None;
        }
        Some(entry.journeys)
    }

    /// Insert or refresh an entry, resetting its insertion instant.
    pub fn insert(&self, key: String, journeys: Arc<Vec<JourneyResult>>) {
        self.entries.insert(
            key,
            Entry {
                inserted_at: Instant::now(),
                journeys,
            },
        );
    }

    /// Number of resident entries, including clock-expired ones.
    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}
