//! Router configuration.

use std::path::PathBuf;

use crate::cache::{DiskTierConfig, MemoryTierConfig};

/// Default round budget: up to five transfers.
const DEFAULT_MAX_ROUNDS: usize = 6;

/// Configuration for the whole routing core.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Path to the bundled stop table asset.
    pub stop_asset: PathBuf,

    /// Path to the bundled route/trip table asset.
    pub route_asset: PathBuf,

    /// Round budget for the path search; each round explores one more
    /// transfer.
    pub max_rounds: usize,

    /// Memory tier tuning.
    pub memory: MemoryTierConfig,

    /// Disk tier tuning.
    pub disk: DiskTierConfig,
}

impl RouterConfig {
    /// Create a configuration from the two asset paths and the cache
    /// directory, with default tuning everywhere else.
    pub fn new(
        stop_asset: impl Into<PathBuf>,
        route_asset: impl Into<PathBuf>,
        cache_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            stop_asset: stop_asset.into(),
            route_asset: route_asset.into(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            memory: MemoryTierConfig::default(),
            disk: DiskTierConfig::new(cache_directory),
        }
    }

    /// Set a custom round budget.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Set custom memory tier tuning.
    pub fn with_memory(mut self, memory: MemoryTierConfig) -> Self {
        self.memory = memory;
        self
    }

    /// Set custom disk tier tuning.
    pub fn with_disk(mut self, disk: DiskTierConfig) -> Self {
        self.disk = disk;
        self
    }
}
