//! Stop index: name search and nearest-stop queries.
//!
//! Built once from the engine's stop snapshot right after the timetable
//! loads, then read-only for the rest of the process lifetime.

mod normalize;
mod stop_index;

pub use normalize::{fuzzy_contains, normalize};
pub use stop_index::StopIndex;
