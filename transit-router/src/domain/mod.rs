//! Domain types for the transit router.
//!
//! This module contains the core model types shared by the stop index,
//! the journey engine and the cache tiers. The stop set is loaded once
//! from the bundled dataset and treated as immutable afterwards, so these
//! types carry no mutation API.

mod journey;
mod stop;
mod time;

pub use journey::{IntermediateStop, JourneyLeg, JourneyResult};
#[cfg(test)]
pub(crate) use journey::test_leg;
pub use stop::{Stop, StopId};
pub use time::{hour_of_day, now_seconds_since_midnight, Seconds, SECONDS_PER_DAY};
