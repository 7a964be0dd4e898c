//! Repository facade: the single entry point for the UI layer.
//!
//! One long-lived instance per process, constructed at startup and
//! handed to consumers by reference. Every query self-initializes on
//! first use; routing answers flow memory tier, then disk tier, then
//! the engine, with results written back to both tiers.

use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use crate::cache::{
    bucket_departure_time, build_key, CacheStatistics, DiskTier, DiskTierConfig, MemoryTier,
    MemoryTierConfig,
};
use crate::config::RouterConfig;
use crate::domain::{now_seconds_since_midnight, JourneyResult, Seconds, Stop, StopId};
use crate::engine::{map_raw_journeys, EngineError, InitOutcome, JourneyEngine, PathEngine};
use crate::index::StopIndex;

/// Facade over the stop index, the journey engine and both cache
/// tiers.
///
/// Generic over the engine so tests can drive the cache orchestration
/// against a mock; production code uses the default `JourneyEngine`.
pub struct JourneyRepository<E = JourneyEngine> {
    engine: E,
    index: OnceLock<Arc<StopIndex>>,
    memory: Arc<MemoryTier>,
    disk: Arc<DiskTier>,
}

impl JourneyRepository {
    /// Build the production repository from a configuration.
    pub fn new(config: RouterConfig) -> Self {
        let engine = JourneyEngine::new(config.stop_asset, config.route_asset, config.max_rounds);
        Self::with_engine(engine, &config.memory, config.disk)
    }
}

impl<E: PathEngine> JourneyRepository<E> {
    /// Build a repository around an arbitrary engine.
    pub fn with_engine(
        engine: E,
        memory_config: &MemoryTierConfig,
        disk_config: DiskTierConfig,
    ) -> Self {
        Self {
            engine,
            index: OnceLock::new(),
            memory: Arc::new(MemoryTier::new(memory_config)),
            disk: Arc::new(DiskTier::new(disk_config)),
        }
    }

    /// Explicit initialization. Failures propagate so the caller can
    /// retry or surface an error state; every query below also
    /// self-initializes, so calling this up front is optional.
    pub async fn initialize(&self) -> Result<InitOutcome, EngineError> {
        let outcome = self.engine.initialize().await?;
        self.build_index();
        Ok(outcome)
    }

    fn build_index(&self) {
        if self.index.get().is_some() {
            return;
        }
        if let Some(stops) = self.engine.stops() {
            let _ = self.index.set(Arc::new(StopIndex::build(&stops)));
        }
    }

    /// Initialize if needed, degrading to `None` (callers answer with
    /// an empty result) when the engine cannot come up.
    async fn ready_index(&self) -> Option<Arc<StopIndex>> {
        match self.initialize().await {
            Ok(_) => self.index.get().cloned(),
            Err(e) => {
                warn!(error = %e, "initialization failed; answering empty");
                None
            }
        }
    }

    /// Free-text stop search, ranked prefix matches first.
    pub async fn search_stops(&self, query: &str) -> Vec<Arc<Stop>> {
        match self.ready_index().await {
            Some(index) => index.search_by_name(query),
            None => Vec::new(),
        }
    }

    /// Closest stops to a coordinate, deduplicated by name.
    pub async fn find_nearest_stops(
        &self,
        latitude: f64,
        longitude: f64,
        limit: usize,
    ) -> Vec<Arc<Stop>> {
        match self.ready_index().await {
            Some(index) => index.find_nearest(latitude, longitude, limit),
            None => Vec::new(),
        }
    }

    /// The single closest stop to a coordinate.
    pub async fn find_closest_stop(&self, latitude: f64, longitude: f64) -> Option<Arc<Stop>> {
        self.find_nearest_stops(latitude, longitude, 1)
            .await
            .into_iter()
            .next()
    }

    /// All platform ids sharing a display name, for building the id
    /// sets `compute_journeys` expects.
    pub async fn stop_ids_for_name(&self, name: &str) -> Vec<StopId> {
        match self.ready_index().await {
            Some(index) => index.stop_ids_for_name(name),
            None => Vec::new(),
        }
    }

    /// Compute optimal journeys between two stop-id sets.
    ///
    /// Tier order is strict: memory, then disk (promoting hits into
    /// memory), then the engine. Non-empty results are written back to
    /// both tiers; the disk write is fire-and-forget. Empty results are
    /// never cached, so a later retry re-attempts the engine. Engine
    /// failures degrade to an empty list; "no itinerary found" and
    /// "internal error suppressed" are indistinguishable here by
    /// design.
    pub async fn compute_journeys(
        &self,
        origins: &[StopId],
        destinations: &[StopId],
        departure_seconds: Option<Seconds>,
    ) -> Vec<JourneyResult> {
        if self.ready_index().await.is_none() {
            return Vec::new();
        }

        // All queries inside a bucket share a key and an engine answer.
        let departure = departure_seconds.unwrap_or_else(now_seconds_since_midnight);
        let bucketed = bucket_departure_time(departure);
        let key = build_key(origins, destinations, bucketed);

        if let Some(hit) = self.memory.get(&key) {
            debug!(%key, "memory tier hit");
            return (*hit).clone();
        }

        let disk = Arc::clone(&self.disk);
        let disk_key = key.clone();
        let disk_hit = tokio::task::spawn_blocking(move || disk.get(&disk_key))
            .await
            .ok()
            .flatten();
        if let Some(journeys) = disk_hit {
            debug!(%key, "disk tier hit");
            let shared = Arc::new(journeys);
            self.memory.insert(key, Arc::clone(&shared));
            return (*shared).clone();
        }

        if origins.is_empty() || destinations.is_empty() {
            return Vec::new();
        }

        let raw = match self
            .engine
            .compute_optimal_paths(origins, destinations, Some(bucketed))
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "journey computation failed; answering empty");
                return Vec::new();
            }
        };

        let Some(index) = self.index.get() else {
            return Vec::new();
        };
        let journeys = map_raw_journeys(index, raw);
        if journeys.is_empty() {
            return journeys;
        }

        self.memory
            .insert(key.clone(), Arc::new(journeys.clone()));

        let disk = Arc::clone(&self.disk);
        let to_persist = journeys.clone();
        tokio::spawn(async move {
            let write = tokio::task::spawn_blocking(move || disk.put(&key, &to_persist)).await;
            match write {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "disk cache write failed"),
                Err(e) => warn!(error = %e, "disk cache write task failed"),
            }
        });

        journeys
    }

    /// Copy still-valid disk entries into the memory tier, so the first
    /// interactive queries after a cold start skip disk I/O.
    /// Best-effort; returns the number of entries promoted.
    pub async fn preload_cache(&self) -> usize {
        let disk = Arc::clone(&self.disk);
        let memory = Arc::clone(&self.memory);
        match tokio::task::spawn_blocking(move || disk.preload(&memory)).await {
            Ok(promoted) => promoted,
            Err(e) => {
                warn!(error = %e, "cache preload task failed");
                0
            }
        }
    }

    /// Remove expired disk entries. Safe alongside ongoing traffic;
    /// returns the number of entries removed.
    pub async fn cleanup_cache(&self) -> usize {
        let disk = Arc::clone(&self.disk);
        match tokio::task::spawn_blocking(move || disk.cleanup_expired()).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "cache cleanup task failed");
                0
            }
        }
    }

    /// Disk tier statistics, for diagnostics.
    pub fn cache_statistics(&self) -> CacheStatistics {
        self.disk.statistics()
    }
}
