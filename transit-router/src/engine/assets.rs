//! Binary timetable assets.
//!
//! The static dataset ships as two binary files: a stop table and a
//! route/trip table. Both are bincode-encoded and read in full before
//! decoding; the tables are small enough (a few megabytes for a
//! metropolitan network) that streaming would buy nothing.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors raised while loading a timetable asset.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// Asset file missing or unreadable
    #[error("failed to read asset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Asset bytes are not a valid table
    #[error("failed to decode asset {path}: {message}")]
    Decode { path: String, message: String },

    /// Decoded table violates a structural invariant
    #[error("malformed asset {path}: {message}")]
    Malformed { path: String, message: String },
}

/// One stop of the static dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    /// Persistent stop id.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// The decoded stop table. Record order defines stop positions: the
/// engine reports legs in terms of indices into this array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopTable {
    pub stops: Vec<StopRecord>,
}

/// One trip of a route: per-stop times, parallel to the route's
/// `stop_positions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    /// Departure time at each stop of the route, seconds since midnight.
    pub departures: Vec<u32>,
    /// Arrival time at each stop of the route, seconds since midnight.
    pub arrivals: Vec<u32>,
}

/// A route: an ordered stop sequence plus the trips running along it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    /// Display name of the route ("A", "T1", "C3").
    pub name: String,
    /// Direction or headsign, when the dataset carries one.
    pub direction: Option<String>,
    /// Stop positions (indices into the stop table) in travel order.
    pub stop_positions: Vec<usize>,
    /// Trips in departure order at the first stop.
    pub trips: Vec<TripRecord>,
}

/// A walking transfer between two nearby stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Origin stop position.
    pub from_position: usize,
    /// Destination stop position.
    pub to_position: usize,
    /// Walking duration in seconds.
    pub duration_seconds: u32,
}

/// The decoded route/trip table, including walking transfers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTable {
    pub routes: Vec<RouteRecord>,
    pub transfers: Vec<TransferRecord>,
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, AssetError> {
    std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn decode<T: serde::de::DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, AssetError> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| AssetError::Decode {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

/// Decode the stop table asset.
pub fn decode_stop_table(path: &Path) -> Result<StopTable, AssetError> {
    let bytes = read_bytes(path)?;
    decode(path, &bytes)
}

/// Decode the route/trip table asset and validate its structure against
/// the already-decoded stop table.
pub fn decode_route_table(path: &Path, stop_count: usize) -> Result<RouteTable, AssetError> {
    let bytes = read_bytes(path)?;
    let table: RouteTable = decode(path, &bytes)?;

    let malformed = |message: String| AssetError::Malformed {
        path: path.display().to_string(),
        message,
    };

    for (route_idx, route) in table.routes.iter().enumerate() {
        if route.stop_positions.iter().any(|&p| p >= stop_count) {
            return Err(malformed(format!(
                "route {} ({}) references a stop position past the stop table",
                route_idx, route.name
            )));
        }
        for (trip_idx, trip) in route.trips.iter().enumerate() {
            if trip.departures.len() != route.stop_positions.len()
                || trip.arrivals.len() != route.stop_positions.len()
            {
                return Err(malformed(format!(
                    "route {} ({}) trip {} has time arrays not matching its stop sequence",
                    route_idx, route.name, trip_idx
                )));
            }
        }
    }

    if table
        .transfers
        .iter()
        .any(|t| t.from_position >= stop_count || t.to_position >= stop_count)
    {
        return Err(malformed(
            "transfer references a stop position past the stop table".to_string(),
        ));
    }

    Ok(table)
}

/// Encode a stop table to asset bytes. Used by the asset build pipeline
/// and by tests.
pub fn encode_stop_table(table: &StopTable) -> Vec<u8> {
    bincode::serde::encode_to_vec(table, bincode::config::standard())
        .expect("stop table encoding cannot fail")
}

/// Encode a route table to asset bytes. Used by the asset build pipeline
/// and by tests.
pub fn encode_route_table(table: &RouteTable) -> Vec<u8> {
    bincode::serde::encode_to_vec(table, bincode::config::standard())
        .expect("route table encoding cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stop_table() -> StopTable {
        StopTable {
            stops: vec![
                StopRecord {
                    id: 1,
                    name: "Bellecour".to_string(),
                    latitude: 45.757,
                    longitude: 4.832,
                },
                StopRecord {
                    id: 2,
                    name: "Part-Dieu".to_string(),
                    latitude: 45.760,
                    longitude: 4.860,
                },
            ],
        }
    }

    fn sample_route_table() -> RouteTable {
        RouteTable {
            routes: vec![RouteRecord {
                name: "A".to_string(),
                direction: Some("Vaulx-en-Velin".to_string()),
                stop_positions: vec![0, 1],
                trips: vec![TripRecord {
                    departures: vec![28_800, 29_400],
                    arrivals: vec![28_800, 29_400],
                }],
            }],
            transfers: Vec::new(),
        }
    }

    #[test]
    fn stop_table_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stops.bin");
        std::fs::write(&path, encode_stop_table(&sample_stop_table())).unwrap();

        let decoded = decode_stop_table(&path).unwrap();
        assert_eq!(decoded, sample_stop_table());
    }

    #[test]
    fn route_table_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.bin");
        std::fs::write(&path, encode_route_table(&sample_route_table())).unwrap();

        let decoded = decode_route_table(&path, 2).unwrap();
        assert_eq!(decoded, sample_route_table());
    }

    #[test]
    fn missing_asset_is_io_error() {
        let err = decode_stop_table(Path::new("/nonexistent/stops.bin")).unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
    }

    #[test]
    fn corrupt_asset_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stops.bin");
        std::fs::write(&path, b"definitely not bincode").unwrap();

        let err = decode_stop_table(&path).unwrap_err();
        assert!(matches!(err, AssetError::Decode { .. }));
    }

    #[test]
    fn route_referencing_unknown_stop_is_malformed() {
        let mut table = sample_route_table();
        table.routes[0].stop_positions = vec![0, 7];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.bin");
        std::fs::write(&path, encode_route_table(&table)).unwrap();

        let err = decode_route_table(&path, 2).unwrap_err();
        assert!(matches!(err, AssetError::Malformed { .. }));
    }

    #[test]
    fn trip_with_misaligned_times_is_malformed() {
        let mut table = sample_route_table();
        table.routes[0].trips[0].arrivals.pop();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.bin");
        std::fs::write(&path, encode_route_table(&table)).unwrap();

        let err = decode_route_table(&path, 2).unwrap_err();
        assert!(matches!(err, AssetError::Malformed { .. }));
    }

    #[test]
    fn transfer_referencing_unknown_stop_is_malformed() {
        let mut table = sample_route_table();
        table.transfers.push(TransferRecord {
            from_position: 0,
            to_position: 9,
            duration_seconds: 120,
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.bin");
        std::fs::write(&path, encode_route_table(&table)).unwrap();

        let err = decode_route_table(&path, 2).unwrap_err();
        assert!(matches!(err, AssetError::Malformed { .. }));
    }
}
