//! Multi-tier cache for computed journeys.
//!
//! Two tiers in front of the engine: a bounded in-process LRU with a
//! short validity window, and a persisted disk cache with daily
//! validity that survives restarts. Both are keyed by the canonical
//! time-bucketed query key.

mod disk;
mod key;
mod memory;

pub use disk::{CacheError, CacheStatistics, DiskTier, DiskTierConfig};
pub use key::{build_key, bucket_departure_time};
pub use memory::{MemoryTier, MemoryTierConfig};
