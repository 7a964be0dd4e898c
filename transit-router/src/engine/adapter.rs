//! Engine lifecycle and query surface.
//!
//! `JourneyEngine` owns the decoded timetable. Initialization decodes
//! the two bundled assets on the blocking pool, exactly once: a mutex
//! plus a ready flag gives the double-checked pattern, so the common
//! already-ready case never takes the lock, concurrent callers during
//! initialization wait on it, and a decode failure leaves the engine
//! retryable.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::assets::{self, AssetError};
use super::raptor::{Network, RawJourney};
use crate::domain::{
    now_seconds_since_midnight, IntermediateStop, JourneyLeg, JourneyResult, Seconds, Stop, StopId,
};
use crate::index::StopIndex;

/// Errors from the journey engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A timetable asset failed to load
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// A background task died before completing
    #[error("engine task failed: {message}")]
    Task { message: String },

    /// A query arrived before successful initialization
    #[error("engine is not initialized")]
    NotReady,
}

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

/// What an initialization call observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// This call performed the initialization.
    Initialized,

    /// The engine was already ready; nothing was done.
    AlreadyReady,

    /// Another caller is initializing right now. Not a failure.
    AlreadyInitializing,
}

/// Seam between the repository facade and the engine, so the facade can
/// be exercised against a mock with call bookkeeping.
#[allow(async_fn_in_trait)]
pub trait PathEngine {
    /// Bring the engine to `Ready`, waiting if another caller is
    /// already initializing.
    async fn initialize(&self) -> Result<InitOutcome, EngineError>;

    /// Snapshot of the loaded stop list, in position order. `None`
    /// before successful initialization.
    fn stops(&self) -> Option<Vec<Arc<Stop>>>;

    /// Compute raw Pareto-optimal journeys between two stop-id sets.
    /// Empty input sets short-circuit to an empty result.
    async fn compute_optimal_paths(
        &self,
        origins: &[StopId],
        destinations: &[StopId],
        departure_seconds: Option<Seconds>,
    ) -> Result<Vec<RawJourney>, EngineError>;
}

/// Everything decoded at initialization. Written once, read-only after.
struct Loaded {
    stops: Vec<Arc<Stop>>,
    id_to_position: HashMap<StopId, usize>,
    network: Network,
}

/// The journey engine: loaded timetable plus search entry points.
pub struct JourneyEngine {
    stop_asset: PathBuf,
    route_asset: PathBuf,
    max_rounds: usize,
    ready: AtomicBool,
    state: Mutex<EngineState>,
    loaded: OnceLock<Arc<Loaded>>,
}

impl JourneyEngine {
    /// Create an uninitialized engine reading the given assets.
    pub fn new(
        stop_asset: impl Into<PathBuf>,
        route_asset: impl Into<PathBuf>,
        max_rounds: usize,
    ) -> Self {
        Self {
            stop_asset: stop_asset.into(),
            route_asset: route_asset.into(),
            max_rounds,
            ready: AtomicBool::new(false),
            state: Mutex::new(EngineState::Uninitialized),
            loaded: OnceLock::new(),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> EngineState {
        *self.state.lock().await
    }

    /// Non-blocking initialization attempt: if another caller holds the
    /// init lock, report `AlreadyInitializing` instead of waiting.
    pub async fn try_initialize(&self) -> Result<InitOutcome, EngineError> {
        if self.ready.load(Ordering::Acquire) {
            return Ok(InitOutcome::AlreadyReady);
        }
        let Ok(guard) = self.state.try_lock() else {
            return Ok(InitOutcome::AlreadyInitializing);
        };
        self.initialize_locked(guard).await
    }

    async fn initialize_locked(
        &self,
        mut state: tokio::sync::MutexGuard<'_, EngineState>,
    ) -> Result<InitOutcome, EngineError> {
        // Re-check under the lock: a waiter arriving during another
        // caller's decode observes success here.
        if self.ready.load(Ordering::Acquire) {
            return Ok(InitOutcome::AlreadyReady);
        }

        *state = EngineState::Initializing;
        debug!("decoding timetable assets");

        let stop_asset = self.stop_asset.clone();
        let route_asset = self.route_asset.clone();
        let decoded = tokio::task::spawn_blocking(move || {
            let stop_table = assets::decode_stop_table(&stop_asset)?;
            let route_table = assets::decode_route_table(&route_asset, stop_table.stops.len())?;
            Ok::<_, AssetError>((stop_table, route_table))
        })
        .await;

        let (stop_table, route_table) = match decoded {
            Ok(Ok(tables)) => tables,
            Ok(Err(e)) => {
                *state = EngineState::Failed;
                warn!(error = %e, "timetable initialization failed");
                return Err(e.into());
            }
            Err(join_error) => {
                *state = EngineState::Failed;
                warn!(error = %join_error, "timetable decode task failed");
                return Err(EngineError::Task {
                    message: join_error.to_string(),
                });
            }
        };

        let stops: Vec<Arc<Stop>> = stop_table
            .stops
            .into_iter()
            .map(|record| {
                Arc::new(Stop::new(
                    StopId(record.id),
                    record.name,
                    record.latitude,
                    record.longitude,
                ))
            })
            .collect();

        let id_to_position = stops
            .iter()
            .enumerate()
            .map(|(position, stop)| (stop.id, position))
            .collect();

        let network = Network::new(stops.len(), route_table);

        let _ = self.loaded.set(Arc::new(Loaded {
            stops,
            id_to_position,
            network,
        }));

        *state = EngineState::Ready;
        self.ready.store(true, Ordering::Release);
        debug!("timetable ready");

        Ok(InitOutcome::Initialized)
    }
}

impl PathEngine for JourneyEngine {
    async fn initialize(&self) -> Result<InitOutcome, EngineError> {
        if self.ready.load(Ordering::Acquire) {
            return Ok(InitOutcome::AlreadyReady);
        }
        let guard = self.state.lock().await;
        self.initialize_locked(guard).await
    }

    fn stops(&self) -> Option<Vec<Arc<Stop>>> {
        self.loaded.get().map(|loaded| loaded.stops.clone())
    }

    async fn compute_optimal_paths(
        &self,
        origins: &[StopId],
        destinations: &[StopId],
        departure_seconds: Option<Seconds>,
    ) -> Result<Vec<RawJourney>, EngineError> {
        if origins.is_empty() || destinations.is_empty() {
            return Ok(Vec::new());
        }

        let loaded = self.loaded.get().cloned().ok_or(EngineError::NotReady)?;
        let departure = departure_seconds.unwrap_or_else(now_seconds_since_midnight);

        // Ids with no position in this dataset generation are dropped;
        // routing must survive data skew.
        let origin_positions: Vec<usize> = origins
            .iter()
            .filter_map(|id| loaded.id_to_position.get(id).copied())
            .collect();
        let destination_positions: Vec<usize> = destinations
            .iter()
            .filter_map(|id| loaded.id_to_position.get(id).copied())
            .collect();

        if origin_positions.is_empty() || destination_positions.is_empty() {
            return Ok(Vec::new());
        }

        let max_rounds = self.max_rounds;
        tokio::task::spawn_blocking(move || {
            loaded
                .network
                .search(&origin_positions, &destination_positions, departure, max_rounds)
        })
        .await
        .map_err(|e| EngineError::Task {
            message: e.to_string(),
        })
    }
}

/// Map raw engine journeys into caller-facing results, resolving stop
/// positions through the index.
///
/// Fail-closed: a journey containing any leg whose boarding, alighting,
/// or intermediate position does not resolve is discarded whole. A
/// journey with a gap is not a valid journey. Misaligned intermediate
/// arrays are not fatal; the extra elements are ignored.
///
/// Results are ordered by arrival time, then by leg count.
pub fn map_raw_journeys(index: &StopIndex, raw: Vec<RawJourney>) -> Vec<JourneyResult> {
    let mut journeys: Vec<JourneyResult> = raw
        .into_iter()
        .filter_map(|journey| map_journey(index, journey))
        .collect();

    journeys.sort_by_key(|journey| (journey.arrival_time, journey.legs.len()));
    journeys
}

fn map_journey(index: &StopIndex, raw: RawJourney) -> Option<JourneyResult> {
    let legs = raw
        .into_iter()
        .map(|leg| map_leg(index, leg))
        .collect::<Option<Vec<_>>>()?;

    JourneyResult::from_legs(legs)
}

fn map_leg(index: &StopIndex, raw: super::raptor::RawLeg) -> Option<JourneyLeg> {
    let from = index.stop_at(raw.from_stop_position)?;
    let to = index.stop_at(raw.to_stop_position)?;

    let mut intermediate_stops = Vec::new();
    for (&position, &arrival_time) in raw
        .intermediate_stop_positions
        .iter()
        .zip(&raw.intermediate_arrival_times)
    {
        let stop = index.stop_at(position)?;
        intermediate_stops.push(IntermediateStop {
            name: stop.name.clone(),
            arrival_time,
            latitude: stop.latitude,
            longitude: stop.longitude,
        });
    }

    Some(JourneyLeg {
        from_stop_name: from.name.clone(),
        from_latitude: from.latitude,
        from_longitude: from.longitude,
        to_stop_name: to.name.clone(),
        to_latitude: to.latitude,
        to_longitude: to.longitude,
        departure_time: raw.departure_time,
        arrival_time: raw.arrival_time,
        route_name: raw.route_name,
        is_walking: raw.is_transfer,
        direction: raw.direction,
        intermediate_stops,
    })
}
