//! Journey engine: timetable assets, path search, and lifecycle.
//!
//! The engine owns the decoded static timetable and computes optimal
//! multi-leg journeys between stop sets with a round-based search. It is
//! fully offline: both input assets are bundled with the application.

mod adapter;
mod assets;
mod raptor;

pub use adapter::{map_raw_journeys, EngineError, EngineState, InitOutcome, JourneyEngine, PathEngine};
pub use assets::{
    decode_route_table, decode_stop_table, encode_route_table, encode_stop_table, AssetError,
    RouteRecord, RouteTable, StopRecord, StopTable, TransferRecord, TripRecord,
};
pub use raptor::{Network, RawJourney, RawLeg};
