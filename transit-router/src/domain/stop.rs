//! Stop types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Persistent identifier of a stop, stable within one static dataset
/// generation.
///
/// Distinct from a stop *position*: the position is the ordinal index of
/// the stop within the loaded stop array, and is what the engine reports
/// in raw legs. Ids survive across queries; positions are only meaningful
/// against one loaded dataset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StopId(pub u32);

impl fmt::Debug for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopId({})", self.0)
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A physical stop of the network: metro platform, tram stop, bus stop.
///
/// Names are not unique. Several platforms of the same station share a
/// display name and differ only by id and coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    /// Persistent stop id.
    pub id: StopId,

    /// Display name, as shown to the user.
    pub name: String,

    /// Latitude in degrees.
    pub latitude: f64,

    /// Longitude in degrees.
    pub longitude: f64,
}

impl Stop {
    /// Create a new stop.
    pub fn new(id: StopId, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_id_display() {
        assert_eq!(StopId(42).to_string(), "42");
        assert_eq!(format!("{:?}", StopId(42)), "StopId(42)");
    }

    #[test]
    fn stop_id_ordering_is_numeric() {
        let mut ids = vec![StopId(30), StopId(2), StopId(100)];
        ids.sort();
        assert_eq!(ids, vec![StopId(2), StopId(30), StopId(100)]);
    }

    #[test]
    fn stop_construction() {
        let stop = Stop::new(StopId(1), "Bellecour", 45.757, 4.832);
        assert_eq!(stop.id, StopId(1));
        assert_eq!(stop.name, "Bellecour");
        assert_eq!(stop.latitude, 45.757);
        assert_eq!(stop.longitude, 4.832);
    }
}
