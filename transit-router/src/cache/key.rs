//! Canonical cache key for a routing query.
//!
//! The key is `origins|destinations|bucket`, with both id lists sorted
//! ascending so that equivalent queries produce identical keys, and the
//! departure time floored to a bucket boundary so that queries issued
//! moments apart share an entry.
//!
//! Bucket width is the hit-rate lever: peak-hour service is dense
//! enough that 5-minute buckets still align with real headways, while
//! off-peak service tolerates 15-minute buckets for better reuse.
//! Rounding is always floor, never nearest: a cached journey must never
//! depart later than the caller asked for.

use crate::domain::{hour_of_day, Seconds, StopId};

/// Bucket width during peak hours, seconds.
const PEAK_BUCKET: Seconds = 5 * 60;

/// Bucket width off-peak, seconds.
const OFF_PEAK_BUCKET: Seconds = 15 * 60;

/// Peak windows: 7:00-9:59 and 17:00-19:59, by wrapped hour of day.
fn is_peak(seconds: Seconds) -> bool {
    let hour = hour_of_day(seconds);
    (7..10).contains(&hour) || (17..20).contains(&hour)
}

/// Floor a departure time to its bucket boundary.
pub fn bucket_departure_time(seconds: Seconds) -> Seconds {
    let width = if is_peak(seconds) {
        PEAK_BUCKET
    } else {
        OFF_PEAK_BUCKET
    };
    seconds - seconds % width
}

/// Build the canonical key from the raw id sets and an already-bucketed
/// departure time.
pub fn build_key(origins: &[StopId], destinations: &[StopId], bucketed: Seconds) -> String {
    let mut origins = origins.to_vec();
    origins.sort();
    let mut destinations = destinations.to_vec();
    destinations.sort();

    let join = |ids: &[StopId]| {
        ids.iter()
            .map(StopId::to_string)
            .collect::<Vec<_>>()
            .join(",")
    };

    format!("{}|{}|{}", join(&origins), join(&destinations), bucketed)
}
