//! Service time helpers.
//!
//! Times in the static timetable are seconds since local midnight of the
//! service day. Services running past midnight keep counting upwards, so
//! values above 86400 are valid and mean "after midnight, same service
//! day" (25:30 service time is 91800).

use chrono::Timelike;

/// Seconds since local midnight of the service day. May exceed 86400.
pub type Seconds = u32;

/// Seconds in a civil day.
pub const SECONDS_PER_DAY: Seconds = 86_400;

/// Hour of day for a service time, wrapped modulo 24.
///
/// A 25:30 service time maps to hour 1.
pub fn hour_of_day(seconds: Seconds) -> u32 {
    (seconds / 3600) % 24
}

/// Current wall-clock time as seconds since local midnight.
pub fn now_seconds_since_midnight() -> Seconds {
    chrono::Local::now().num_seconds_from_midnight()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_of_day_plain() {
        assert_eq!(hour_of_day(0), 0);
        assert_eq!(hour_of_day(3599), 0);
        assert_eq!(hour_of_day(3600), 1);
        assert_eq!(hour_of_day(28_800), 8);
        assert_eq!(hour_of_day(86_399), 23);
    }

    #[test]
    fn hour_of_day_wraps_past_midnight() {
        // 25:30 service time is hour 1 of the next civil day
        assert_eq!(hour_of_day(25 * 3600 + 30 * 60), 1);
        assert_eq!(hour_of_day(SECONDS_PER_DAY), 0);
        assert_eq!(hour_of_day(SECONDS_PER_DAY + 3600), 1);
    }

    #[test]
    fn now_is_within_a_day() {
        // The current wall-clock value is always below 86400
        assert!(now_seconds_since_midnight() < SECONDS_PER_DAY);
    }
}
