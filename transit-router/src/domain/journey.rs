//! Journey result types.
//!
//! A `JourneyResult` is the caller-facing output of a routing query: an
//! ordered list of legs with resolved stop names and coordinates. These
//! types are also the disk-tier payload, hence the serde derives.

use serde::{Deserialize, Serialize};

use super::time::Seconds;

/// A stop served along a leg, between boarding and alighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediateStop {
    /// Display name of the stop.
    pub name: String,

    /// Arrival time at the stop, seconds since midnight.
    pub arrival_time: Seconds,

    /// Latitude in degrees.
    pub latitude: f64,

    /// Longitude in degrees.
    pub longitude: f64,
}

/// One continuous segment of a journey: a ride on a single route, or a
/// walking transfer between two stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyLeg {
    /// Display name of the boarding stop.
    pub from_stop_name: String,

    /// Boarding stop latitude in degrees.
    pub from_latitude: f64,

    /// Boarding stop longitude in degrees.
    pub from_longitude: f64,

    /// Display name of the alighting stop.
    pub to_stop_name: String,

    /// Alighting stop latitude in degrees.
    pub to_latitude: f64,

    /// Alighting stop longitude in degrees.
    pub to_longitude: f64,

    /// Departure time from the boarding stop, seconds since midnight.
    pub departure_time: Seconds,

    /// Arrival time at the alighting stop, seconds since midnight.
    pub arrival_time: Seconds,

    /// Route display name. `None` for a walking transfer.
    pub route_name: Option<String>,

    /// Whether this leg is a walking transfer rather than a ride.
    pub is_walking: bool,

    /// Route direction or headsign, when the dataset carries one.
    pub direction: Option<String>,

    /// Stops served strictly between boarding and alighting.
    pub intermediate_stops: Vec<IntermediateStop>,
}

/// A complete journey from origin to destination.
///
/// Invariants: at least one leg; departure time equals the first leg's
/// departure; arrival time equals the last leg's arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyResult {
    /// Departure time of the first leg, seconds since midnight.
    pub departure_time: Seconds,

    /// Arrival time of the last leg, seconds since midnight.
    pub arrival_time: Seconds,

    /// Ordered legs, never empty.
    pub legs: Vec<JourneyLeg>,
}

impl JourneyResult {
    /// Build a journey from its legs.
    ///
    /// Returns `None` for an empty leg list: a journey with no legs is
    /// not a journey, and callers discard it rather than erroring.
    pub fn from_legs(legs: Vec<JourneyLeg>) -> Option<Self> {
        let first = legs.first()?;
        let last = legs.last()?;

        Some(Self {
            departure_time: first.departure_time,
            arrival_time: last.arrival_time,
            legs,
        })
    }

    /// Total duration in whole minutes, truncating.
    pub fn duration_minutes(&self) -> u32 {
        self.arrival_time.saturating_sub(self.departure_time) / 60
    }

    /// Number of transfers: one less than the number of ride legs, with
    /// walking legs not counted as rides.
    pub fn transfer_count(&self) -> usize {
        let rides = self.legs.iter().filter(|leg| !leg.is_walking).count();
        rides.saturating_sub(1)
    }
}

#[cfg(test)]
pub(crate) fn test_leg(
    from: &str,
    to: &str,
    departure_time: Seconds,
    arrival_time: Seconds,
    route_name: Option<&str>,
) -> JourneyLeg {
    JourneyLeg {
        from_stop_name: from.to_string(),
        from_latitude: 0.0,
        from_longitude: 0.0,
        to_stop_name: to.to_string(),
        to_latitude: 0.0,
        to_longitude: 0.0,
        departure_time,
        arrival_time,
        route_name: route_name.map(str::to_string),
        is_walking: route_name.is_none(),
        direction: None,
        intermediate_stops: Vec::new(),
    }
}
